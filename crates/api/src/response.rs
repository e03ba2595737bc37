//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use dashboard_core::{CacheKey, CachedDashboard, DashboardData, Platform, Timeframe};
use serde::{Deserialize, Serialize};
use telemetry::ComponentHealthReport;

/// Cached dashboard for one slice.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub tenant_id: String,
    pub segment_id: String,
    pub timeframe: Timeframe,
    pub platform: Platform,
    pub refreshed_at: DateTime<Utc>,
    pub data: DashboardData,
}

impl DashboardResponse {
    pub fn new(key: CacheKey, entry: CachedDashboard) -> Self {
        Self {
            tenant_id: key.tenant_id,
            segment_id: key.segment_id,
            timeframe: key.timeframe,
            platform: key.platform,
            refreshed_at: entry.refreshed_at,
            data: entry.data,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub clickhouse_connected: bool,
    pub cube_connected: bool,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error carrying the error code of the underlying failure.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.response = self.response.with_details(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<dashboard_core::Error> for ApiError {
    fn from(err: dashboard_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &err {
            dashboard_core::Error::PartialPassFailure {
                slice,
                slices_written,
                source,
            } => ApiError::with_code(status, "REFRESH_001", err.to_string()).with_details(vec![
                format!("failed slice: {}", slice),
                format!("slices written: {}", slices_written),
                format!("cause: {}", source),
            ]),
            dashboard_core::Error::NotFound(msg) => ApiError::not_found(msg.clone()),
            _ => match err.error_code() {
                Some(code) => ApiError::with_code(status, code, err.to_string()),
                None => ApiError::internal(err.to_string()),
            },
        }
    }
}
