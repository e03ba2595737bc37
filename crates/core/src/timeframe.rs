//! Dashboard timeframes and their date windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Relative timeframe a dashboard can be viewed in.
///
/// Ordered by length so iteration over [`Timeframe::ALL`] is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "LAST_7_DAYS")]
    Last7Days,
    #[serde(rename = "LAST_14_DAYS")]
    Last14Days,
    #[serde(rename = "LAST_30_DAYS")]
    Last30Days,
}

impl Timeframe {
    /// Every timeframe, in refresh order.
    pub const ALL: [Timeframe; 3] = [Self::Last7Days, Self::Last14Days, Self::Last30Days];

    /// Number of days covered by the current period.
    pub fn days(&self) -> i64 {
        match self {
            Self::Last7Days => 7,
            Self::Last14Days => 14,
            Self::Last30Days => 30,
        }
    }

    /// Identifier used in cache keys and the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last7Days => "LAST_7_DAYS",
            Self::Last14Days => "LAST_14_DAYS",
            Self::Last30Days => "LAST_30_DAYS",
        }
    }

    /// Resolve a period length in days.
    pub fn from_days(days: u32) -> Result<Self> {
        match days {
            7 => Ok(Self::Last7Days),
            14 => Ok(Self::Last14Days),
            30 => Ok(Self::Last30Days),
            other => Err(Error::unsupported_timeframe(format!("{} days", other))),
        }
    }

    /// Date boundaries of this timeframe relative to `now`.
    pub fn window(&self, now: DateTime<Utc>) -> DateWindow {
        compute_window(*self, now)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LAST_7_DAYS" => Ok(Self::Last7Days),
            "LAST_14_DAYS" => Ok(Self::Last14Days),
            "LAST_30_DAYS" => Ok(Self::Last30Days),
            other => Err(Error::unsupported_timeframe(other)),
        }
    }
}

/// Current and previous period boundaries, inclusive, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub current_start: DateTime<Utc>,
    pub current_end: DateTime<Utc>,
    pub previous_start: DateTime<Utc>,
    pub previous_end: DateTime<Utc>,
}

impl DateWindow {
    /// Calendar dates of the current period.
    pub fn current_dates(&self) -> (NaiveDate, NaiveDate) {
        (self.current_start.date_naive(), self.current_end.date_naive())
    }

    /// Calendar dates of the previous period.
    pub fn previous_dates(&self) -> (NaiveDate, NaiveDate) {
        (self.previous_start.date_naive(), self.previous_end.date_naive())
    }

    /// Calendar dates from the start of the previous period to the end of the current one.
    pub fn full_span_dates(&self) -> (NaiveDate, NaiveDate) {
        (self.previous_start.date_naive(), self.current_end.date_naive())
    }
}

/// Compute the window for `timeframe` as seen at `now`.
///
/// With N days: the current period is the N days ending today, the previous
/// period is the N days immediately before it.
pub fn compute_window(timeframe: Timeframe, now: DateTime<Utc>) -> DateWindow {
    let n = timeframe.days();
    let today = now.date_naive();

    DateWindow {
        current_start: start_of_day(today - Duration::days(n - 1)),
        current_end: end_of_day(today),
        previous_start: start_of_day(today - Duration::days(2 * n - 1)),
        previous_end: end_of_day(today - Duration::days(n)),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    // 23:59:59 is always a valid time of day
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(end))
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
