//! Cached dashboard reads.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use dashboard_core::{CacheKey, Platform, Timeframe};
use serde::Deserialize;
use tracing::debug;

use crate::response::{ApiError, DashboardResponse};
use crate::state::AppState;

/// Slice selection; defaults to the last 7 days across all platforms.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub timeframe: Option<String>,
    pub platform: Option<String>,
}

/// GET /dashboard/:tenant_id/:segment_id - Read one cached slice.
///
/// Never computes anything; a slice that was not refreshed yet is a 404.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Path((tenant_id, segment_id)): Path<(String, String)>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let timeframe = match query.timeframe.as_deref() {
        Some(raw) => raw.parse::<Timeframe>()?,
        None => Timeframe::Last7Days,
    };
    let platform = Platform::from_optional(query.platform.as_deref());
    let key = CacheKey::new(tenant_id, segment_id, timeframe, platform);

    debug!(key = %key, "Reading cached dashboard");

    match state.cache.read(&key).await? {
        Some(entry) => Ok(Json(DashboardResponse::new(key, entry))),
        None => Err(ApiError::not_found(format!("no cached dashboard for {}", key))),
    }
}
