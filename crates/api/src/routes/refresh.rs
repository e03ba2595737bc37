//! On-demand refresh trigger.

use axum::{extract::State, Json};
use dashboard_core::RefreshRequest;
use tracing::info;
use worker::RefreshOutcome;

use crate::response::ApiError;
use crate::state::AppState;

/// POST /refresh - Run one refresh of a tenant segment and report what it did.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    info!(
        tenant_id = %request.tenant_id,
        segment_id = ?request.segment_id,
        "Refresh requested"
    );

    let outcome = state.orchestrator.run(&request).await?;
    Ok(Json(outcome))
}
