//! Refresh engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where refreshed dashboards are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Clickhouse,
    Memory,
}

/// Refresh engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between scheduled refresh rounds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Tenants refreshed by the scheduler (their default segments)
    #[serde(default)]
    pub tenants: Vec<String>,
    /// Attempts per step, including the first
    #[serde(default = "default_step_max_attempts")]
    pub step_max_attempts: u32,
    /// Base backoff between step attempts; multiplied by the attempt number
    #[serde(default = "default_step_backoff_ms")]
    pub step_backoff_ms: u64,
    /// Deadline for a single step attempt
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default)]
    pub cache_backend: CacheBackend,
    /// Seconds between metrics snapshot log lines
    #[serde(default = "default_metrics_log_interval_secs")]
    pub metrics_log_interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    900
}

fn default_step_max_attempts() -> u32 {
    3
}

fn default_step_backoff_ms() -> u64 {
    500
}

fn default_step_timeout_secs() -> u64 {
    300
}

fn default_metrics_log_interval_secs() -> u64 {
    60
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            tenants: Vec::new(),
            step_max_attempts: default_step_max_attempts(),
            step_backoff_ms: default_step_backoff_ms(),
            step_timeout_secs: default_step_timeout_secs(),
            cache_backend: CacheBackend::default(),
            metrics_log_interval_secs: default_metrics_log_interval_secs(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn step_backoff(&self) -> Duration {
        Duration::from_millis(self.step_backoff_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_log_interval_secs)
    }
}
