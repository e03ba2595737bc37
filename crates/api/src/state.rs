//! Application state shared across handlers.

use dashboard_core::CacheStore;
use std::sync::Arc;
use worker::RefreshOrchestrator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Dashboard cache (ClickHouse in production, in-memory in development and tests)
    pub cache: Arc<dyn CacheStore>,
    /// Runs on-demand refreshes
    pub orchestrator: Arc<RefreshOrchestrator>,
}

impl AppState {
    pub fn new(cache: Arc<dyn CacheStore>, orchestrator: Arc<RefreshOrchestrator>) -> Self {
        Self {
            cache,
            orchestrator,
        }
    }
}
