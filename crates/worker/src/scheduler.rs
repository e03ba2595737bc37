//! Scheduler for periodic refresh rounds.

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{error, info, warn};

use dashboard_core::{RefreshRequest, Result};
use telemetry::metrics;

use crate::config::RefreshConfig;
use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome};
use crate::step::{RetryExecutor, StepExecutor};

/// Background scheduler refreshing every configured tenant on an interval.
pub struct RefreshScheduler<E: StepExecutor = RetryExecutor> {
    config: RefreshConfig,
    orchestrator: Arc<RefreshOrchestrator<E>>,
}

impl<E: StepExecutor + 'static> RefreshScheduler<E> {
    pub fn new(config: RefreshConfig, orchestrator: Arc<RefreshOrchestrator<E>>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Starts the refresh and metrics logging loops.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.config.tenants.is_empty() {
            warn!("No tenants configured, scheduled refresh disabled");
        } else {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_refresh_loop().await;
            }));
        }

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        info!(
            tenants = self.config.tenants.len(),
            interval_secs = self.config.interval_secs,
            "Background workers started"
        );
        handles
    }

    /// Refresh every tenant's default segment once, tenants concurrently.
    ///
    /// One tenant failing does not affect the others.
    pub async fn run_round(&self) -> Vec<(String, Result<RefreshOutcome>)> {
        let runs = self.config.tenants.iter().map(|tenant_id| async move {
            let request = RefreshRequest::for_tenant(tenant_id.clone());
            (tenant_id.clone(), self.orchestrator.run(&request).await)
        });

        join_all(runs).await
    }

    async fn run_refresh_loop(&self) {
        let mut ticker = interval(self.config.interval());

        loop {
            ticker.tick().await;

            let results = self.run_round().await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            for (tenant_id, result) in &results {
                if let Err(e) = result {
                    error!(tenant_id = %tenant_id, error = %e, "Scheduled refresh failed");
                }
            }

            info!(
                tenants = results.len(),
                failed = failed,
                "Refresh round complete"
            );
        }
    }

    async fn run_metrics_log(&self) {
        let mut ticker = interval(self.config.metrics_log_interval());

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                runs_started = snapshot.refresh_runs_started,
                runs_skipped = snapshot.refresh_runs_skipped,
                runs_completed = snapshot.refresh_runs_completed,
                runs_failed = snapshot.refresh_runs_failed,
                slices_written = snapshot.slices_written,
                queries_issued = snapshot.queries_issued,
                query_errors = snapshot.query_errors,
                step_retries = snapshot.step_retries,
                run_latency_mean_ms = snapshot.run_latency_mean_ms,
                "Refresh metrics"
            );
        }
    }
}
