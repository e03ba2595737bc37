//! Analytical query contract shared by the aggregator and query backends.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, QueryErrorCode, Result};

/// Time bucket size for timeseries queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Equality filter on one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub member: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl QueryFilter {
    pub fn equals(member: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            member: member.into(),
            operator: "equals".to_string(),
            values,
        }
    }
}

/// One measure over one time dimension, filtered and optionally bucketed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub measure: String,
    pub time_dimension: String,
    /// Inclusive calendar date range.
    pub date_range: (NaiveDate, NaiveDate),
    pub granularity: Option<Granularity>,
    pub order_by: Vec<(String, OrderDirection)>,
    pub filters: Vec<QueryFilter>,
    /// Extra breakdown dimensions returned on each row.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Return every row instead of a single aggregate.
    pub raw_result: bool,
}

impl QueryRequest {
    /// Value of the equality filter on `member`, if present.
    pub fn filter_values(&self, member: &str) -> Option<&[String]> {
        self.filters
            .iter()
            .find(|f| f.member == member)
            .map(|f| f.values.as_slice())
    }

    /// Key the backend uses for the bucketed time dimension on result rows.
    pub fn time_bucket_key(&self) -> String {
        match self.granularity {
            Some(granularity) => format!("{}.{}", self.time_dimension, granularity.as_str()),
            None => self.time_dimension.clone(),
        }
    }
}

/// A single result row, keyed by member name.
pub type ResultRow = Map<String, Value>;

/// Backend answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// Non-raw mode: at most one aggregate row.
    Aggregate(Option<ResultRow>),
    /// Raw mode: every row, in backend order.
    Rows(Vec<ResultRow>),
}

impl QueryResponse {
    pub fn rows(&self) -> &[ResultRow] {
        match self {
            Self::Aggregate(Some(row)) => std::slice::from_ref(row),
            Self::Aggregate(None) => &[],
            Self::Rows(rows) => rows,
        }
    }
}

/// Read a count measure; missing or null means zero.
///
/// Backends commonly serialize counts as strings.
pub fn read_count(row: &ResultRow, key: &str) -> Result<u64> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| malformed(key, &row[key])),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| malformed(key, &row[key])),
        Some(other) => Err(malformed(key, other)),
    }
}

/// Read a date from a timestamp-like value (`2024-03-09T00:00:00.000` or `2024-03-09`).
pub fn read_date(row: &ResultRow, key: &str) -> Result<NaiveDate> {
    let raw = row
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::query(
                QueryErrorCode::MalformedResponse,
                format!("row is missing {}", key),
            )
        })?;

    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
        Error::query(
            QueryErrorCode::MalformedResponse,
            format!("{} is not a date: {}", key, raw),
        )
    })
}

/// Read a breakdown dimension as text; missing values read as empty.
pub fn read_label(row: &ResultRow, key: &str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn malformed(key: &str, value: &Value) -> Error {
    Error::query(
        QueryErrorCode::MalformedResponse,
        format!("{} is not a count: {}", key, value),
    )
}
