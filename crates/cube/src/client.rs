//! Cube REST client.
//!
//! Speaks the `/cubejs-api/v1/load` contract. Long-running queries answer
//! with `{"error": "Continue wait"}` and must be re-posted until data arrives.

use async_trait::async_trait;
use dashboard_core::error::QueryErrorCode;
use dashboard_core::{
    Error, QueryBackend, QueryFilter, QueryRequest, QueryResponse, Result, ResultRow,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::config::CubeConfig;

const CONTINUE_WAIT: &str = "Continue wait";

/// Time dimension clause of a Cube query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeTimeDimension {
    pub dimension: String,
    pub date_range: [String; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
}

/// Query body in Cube's JSON dialect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeQuery {
    pub measures: Vec<String>,
    pub time_dimensions: Vec<CubeTimeDimension>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
    pub order: Vec<[String; 2]>,
    pub filters: Vec<QueryFilter>,
}

impl From<&QueryRequest> for CubeQuery {
    fn from(request: &QueryRequest) -> Self {
        let (start, end) = request.date_range;

        Self {
            measures: vec![request.measure.clone()],
            time_dimensions: vec![CubeTimeDimension {
                dimension: request.time_dimension.clone(),
                date_range: [
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string(),
                ],
                granularity: request.granularity.map(|g| g.as_str().to_string()),
            }],
            dimensions: request.dimensions.clone(),
            order: request
                .order_by
                .iter()
                .map(|(member, direction)| {
                    let direction = match direction {
                        dashboard_core::OrderDirection::Asc => "asc",
                        dashboard_core::OrderDirection::Desc => "desc",
                    };
                    [member.clone(), direction.to_string()]
                })
                .collect(),
            filters: request.filters.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoadBody<'a> {
    query: &'a CubeQuery,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Vec<Map<String, Value>>>,
}

/// HTTP query backend backed by a Cube deployment.
#[derive(Clone)]
pub struct CubeClient {
    http: reqwest::Client,
    config: CubeConfig,
}

impl CubeClient {
    /// Creates a new Cube client.
    pub fn new(config: CubeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Post the query until Cube returns data or the wait budget runs out.
    async fn load_rows(&self, query: &CubeQuery) -> Result<Vec<ResultRow>> {
        let started = Instant::now();
        let url = self.config.load_url();

        loop {
            let mut builder = self.http.post(&url).json(&LoadBody { query });
            if let Some(ref token) = self.config.token {
                builder = builder.header("Authorization", token);
            }

            let response = builder.send().await.map_err(|e| {
                warn!(error = %e, "Cube request failed");
                Error::query(
                    QueryErrorCode::RequestFailed,
                    format!("Cube request failed: {}", e),
                )
            })?;

            let status = response.status();
            let body = response.text().await.map_err(|e| {
                Error::query(
                    QueryErrorCode::RequestFailed,
                    format!("Failed to read Cube response: {}", e),
                )
            })?;

            match parse_load_response(status.as_u16(), &body)? {
                LoadOutcome::Rows(rows) => return Ok(rows),
                LoadOutcome::ContinueWait => {
                    if started.elapsed() >= self.config.max_wait() {
                        return Err(Error::query(
                            QueryErrorCode::Timeout,
                            format!(
                                "Cube query still pending after {}s",
                                self.config.max_wait_secs
                            ),
                        ));
                    }
                    debug!(
                        elapsed_ms = %started.elapsed().as_millis(),
                        "Cube asked to continue waiting"
                    );
                    tokio::time::sleep(self.config.continue_wait_poll()).await;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum LoadOutcome {
    Rows(Vec<ResultRow>),
    ContinueWait,
}

fn parse_load_response(status: u16, body: &str) -> Result<LoadOutcome> {
    let parsed: Option<LoadResponse> = serde_json::from_str(body).ok();

    if let Some(LoadResponse { error: Some(ref error), .. }) = parsed {
        if error == CONTINUE_WAIT {
            return Ok(LoadOutcome::ContinueWait);
        }
        return Err(Error::query(
            QueryErrorCode::RequestFailed,
            format!("Cube returned {}: {}", status, error),
        ));
    }

    if !(200..300).contains(&status) {
        return Err(Error::query(
            QueryErrorCode::RequestFailed,
            format!("Cube returned {}: {}", status, body),
        ));
    }

    match parsed {
        Some(LoadResponse { data: Some(rows), .. }) => Ok(LoadOutcome::Rows(rows)),
        _ => Err(Error::query(
            QueryErrorCode::MalformedResponse,
            "Cube response has no data",
        )),
    }
}

#[async_trait]
impl QueryBackend for CubeClient {
    async fn load(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let query = CubeQuery::from(request);
        let start = Instant::now();
        metrics().queries_issued.inc();

        let result = self.load_rows(&query).await;
        metrics()
            .query_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        let rows = result.inspect_err(|_| metrics().query_errors.inc())?;

        debug!(
            measure = %request.measure,
            rows = rows.len(),
            latency_ms = %start.elapsed().as_millis(),
            "Cube query complete"
        );

        if request.raw_result {
            Ok(QueryResponse::Rows(rows))
        } else {
            Ok(QueryResponse::Aggregate(rows.into_iter().next()))
        }
    }
}
