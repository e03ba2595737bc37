//! Step execution.
//!
//! Every unit of refresh work runs as a named step. Steps must be idempotent:
//! an executor is free to run one more than once.

use async_trait::async_trait;
use dashboard_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::config::RefreshConfig;

/// Runs named steps of a refresh.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn step<T, F, Fut>(&self, name: &str, op: F) -> Result<T>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send;
}

/// Runs every step exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

#[async_trait]
impl StepExecutor for InlineExecutor {
    async fn step<T, F, Fut>(&self, name: &str, op: F) -> Result<T>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        debug!(step = name, "Running step");
        op().await
    }
}

/// Retry policy for [`RetryExecutor`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per step, including the first
    pub max_attempts: u32,
    /// Backoff before attempt n+1 is `backoff * n`
    pub backoff: Duration,
    /// Deadline for a single attempt
    pub step_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            step_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&RefreshConfig> for RetryPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            max_attempts: config.step_max_attempts.max(1),
            backoff: config.step_backoff(),
            step_timeout: config.step_timeout(),
        }
    }
}

/// Runs each step under a timeout, retrying retryable failures with linear backoff.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl StepExecutor for RetryExecutor {
    async fn step<T, F, Fut>(&self, name: &str, op: F) -> Result<T>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.policy.step_timeout, op()).await {
                Ok(result) => result,
                Err(_) => {
                    metrics().step_timeouts.inc();
                    Err(Error::StepTimeout {
                        step: name.to_string(),
                        after_secs: self.policy.step_timeout.as_secs(),
                    })
                }
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let backoff = self.policy.backoff * attempt;
                    warn!(
                        step = name,
                        attempt = attempt,
                        backoff_ms = %backoff.as_millis(),
                        error = %e,
                        "Retrying step"
                    );
                    metrics().step_retries.inc();
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
