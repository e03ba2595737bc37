//! Cube client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cube REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeConfig {
    /// Base URL of the Cube API (without `/cubejs-api/v1`)
    pub url: String,
    /// Value of the `Authorization` header (signed API token)
    pub token: Option<String>,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Delay between "Continue wait" polls in milliseconds
    #[serde(default = "default_continue_wait_poll_ms")]
    pub continue_wait_poll_ms: u64,
    /// Give up on a query still pending after this many seconds
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_continue_wait_poll_ms() -> u64 {
    500
}

fn default_max_wait_secs() -> u64 {
    120
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4000".to_string(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            continue_wait_poll_ms: default_continue_wait_poll_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl CubeConfig {
    /// Full URL of the load endpoint.
    pub fn load_url(&self) -> String {
        format!("{}/cubejs-api/v1/load", self.url.trim_end_matches('/'))
    }

    /// Full URL of the readiness endpoint.
    pub fn ready_url(&self) -> String {
        format!("{}/readyz", self.url.trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn continue_wait_poll(&self) -> Duration {
        Duration::from_millis(self.continue_wait_poll_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}
