//! Refresh orchestrator.
//!
//! A run resolves the segment, plans against the stored watermark, then walks
//! the slices with timeframes outermost and platforms innermost ("all" first).
//! Each slice computes every metric family and is written on its own; the
//! watermark moves to the pass start time only once every slice is written.

use chrono::{DateTime, Utc};
use dashboard_core::{
    ActivityStore, CacheStore, Clock, DashboardData, DateWindow, Error, MetricFamily, Platform,
    QueryBackend, RefreshRequest, Result, SegmentScope, Slice, SystemClock, Timeframe,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::aggregator::MetricAggregator;
use crate::cache_writer::CacheWriter;
use crate::staleness::StalenessDetector;
use crate::step::{RetryExecutor, StepExecutor};

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RefreshStatus {
    /// Nothing new since the watermark; no writes happened.
    Skipped,
    /// Every planned slice was written and the watermark advanced.
    Refreshed {
        #[serde(rename = "slicesWritten")]
        slices_written: usize,
        platforms: Vec<Platform>,
    },
}

/// Result of one refresh run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub run_id: Uuid,
    pub scope: SegmentScope,
    #[serde(flatten)]
    pub status: RefreshStatus,
    /// Watermark read at the start of the run.
    pub watermark_before: Option<DateTime<Utc>>,
    /// Watermark written by the run; `None` when skipped.
    pub watermark_after: Option<DateTime<Utc>>,
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, RefreshStatus::Skipped)
    }

    pub fn slices_written(&self) -> usize {
        match &self.status {
            RefreshStatus::Skipped => 0,
            RefreshStatus::Refreshed { slices_written, .. } => *slices_written,
        }
    }
}

/// Drives refresh runs through a [`StepExecutor`].
pub struct RefreshOrchestrator<E: StepExecutor = RetryExecutor> {
    activity: Arc<dyn ActivityStore>,
    aggregator: MetricAggregator,
    detector: StalenessDetector,
    writer: CacheWriter,
    executor: E,
    clock: Arc<dyn Clock>,
}

impl<E: StepExecutor> RefreshOrchestrator<E> {
    pub fn new(
        activity: Arc<dyn ActivityStore>,
        backend: Arc<dyn QueryBackend>,
        cache: Arc<dyn CacheStore>,
        executor: E,
    ) -> Self {
        Self {
            aggregator: MetricAggregator::new(backend),
            detector: StalenessDetector::new(activity.clone()),
            writer: CacheWriter::new(cache, activity.clone()),
            activity,
            executor,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run one refresh for the requested tenant segment.
    pub async fn run(&self, request: &RefreshRequest) -> Result<RefreshOutcome> {
        request
            .validate()
            .map_err(|e| Error::validation(e.to_string()))?;

        let m = metrics();
        m.refresh_runs_started.inc();
        m.refreshes_in_flight.inc();
        let start = Instant::now();

        let result = self.run_pass(request).await;

        m.refreshes_in_flight.dec();
        m.run_latency_ms.observe(start.elapsed().as_millis() as u64);
        match &result {
            Ok(outcome) if outcome.is_skipped() => m.refresh_runs_skipped.inc(),
            Ok(_) => m.refresh_runs_completed.inc(),
            Err(e) => {
                m.refresh_runs_failed.inc();
                error!(tenant_id = %request.tenant_id, error = %e, "Refresh run failed");
            }
        }

        result
    }

    async fn run_pass(&self, request: &RefreshRequest) -> Result<RefreshOutcome> {
        let run_id = Uuid::new_v4();
        let pass_started_at = self.clock.now();
        let scope = self.resolve_scope(request).await?;

        info!(
            run_id = %run_id,
            tenant_id = %scope.tenant_id,
            segment_id = %scope.segment_id,
            leaf_segments = scope.leaf_segment_ids.len(),
            "Starting dashboard refresh"
        );

        let activity = &self.activity;
        let segment_id = scope.segment_id.as_str();
        let watermark_before = self
            .executor
            .step("read-watermark", move || async move {
                activity.dashboard_last_refreshed_at(segment_id).await
            })
            .await?;

        let detector = &self.detector;
        let leaf_ids = scope.leaf_segment_ids.as_slice();
        let plan = self
            .executor
            .step("plan-refresh", move || async move {
                detector
                    .plan_refresh(segment_id, watermark_before, leaf_ids)
                    .await
            })
            .await?;

        if plan.skip {
            info!(
                run_id = %run_id,
                tenant_id = %scope.tenant_id,
                segment_id = %scope.segment_id,
                watermark = ?watermark_before,
                "No new activity, skipping refresh"
            );
            return Ok(RefreshOutcome {
                run_id,
                scope,
                status: RefreshStatus::Skipped,
                watermark_before,
                watermark_after: None,
            });
        }

        info!(
            run_id = %run_id,
            segment_id = %scope.segment_id,
            platforms = ?plan.platforms,
            "Planned refresh"
        );

        let mut slices_written = 0;
        for timeframe in Timeframe::ALL {
            let window = timeframe.window(pass_started_at);

            for platform in &plan.platforms {
                let slice = Slice::new(scope.segment_id.clone(), timeframe, platform.clone());
                let slice_start = Instant::now();

                if let Err(e) = self
                    .refresh_slice(&scope, &slice, &window, pass_started_at)
                    .await
                {
                    error!(
                        run_id = %run_id,
                        tenant_id = %scope.tenant_id,
                        segment_id = %scope.segment_id,
                        timeframe = %timeframe,
                        platform = %platform,
                        slices_written = slices_written,
                        error = %e,
                        "Slice refresh failed, watermark not advanced"
                    );
                    return Err(Error::partial_pass(slice.to_string(), slices_written, e));
                }

                slices_written += 1;
                metrics()
                    .slice_latency_ms
                    .observe(slice_start.elapsed().as_millis() as u64);
                info!(
                    run_id = %run_id,
                    tenant_id = %scope.tenant_id,
                    segment_id = %scope.segment_id,
                    timeframe = %timeframe,
                    platform = %platform,
                    "Refreshed slice"
                );
            }
        }

        let writer = &self.writer;
        self.executor
            .step("advance-watermark", move || async move {
                writer.advance_watermark(segment_id, pass_started_at).await
            })
            .await?;

        info!(
            run_id = %run_id,
            tenant_id = %scope.tenant_id,
            segment_id = %scope.segment_id,
            slices_written = slices_written,
            watermark = %pass_started_at,
            "Dashboard refresh complete"
        );

        Ok(RefreshOutcome {
            run_id,
            scope,
            status: RefreshStatus::Refreshed {
                slices_written,
                platforms: plan.platforms.into_iter().collect(),
            },
            watermark_before,
            watermark_after: Some(pass_started_at),
        })
    }

    async fn resolve_scope(&self, request: &RefreshRequest) -> Result<SegmentScope> {
        if let Some(segment_id) = &request.segment_id {
            return Ok(SegmentScope::new(
                request.tenant_id.clone(),
                segment_id.clone(),
                request.leaf_segment_ids.clone(),
            ));
        }

        let activity = &self.activity;
        let tenant_id = request.tenant_id.as_str();
        let default_segment = self
            .executor
            .step("resolve-segment", move || async move {
                activity.default_segment(tenant_id).await
            })
            .await?;

        default_segment
            .map(|segment_id| SegmentScope::single(tenant_id, segment_id))
            .ok_or_else(|| Error::missing_segment(tenant_id))
    }

    async fn refresh_slice(
        &self,
        scope: &SegmentScope,
        slice: &Slice,
        window: &DateWindow,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let aggregator = &self.aggregator;
        let platform = &slice.platform;
        let mut data = DashboardData::default();

        for family in MetricFamily::ALL {
            let snapshot = self
                .executor
                .step(&format!("compute:{}:{}", slice, family), move || async move {
                    aggregator
                        .compute_family(family, scope, window, platform)
                        .await
                })
                .await?;
            data.set_family(family, snapshot);
        }

        let writer = &self.writer;
        let tenant_id = scope.tenant_id.as_str();
        let data = &data;
        self.executor
            .step(&format!("write:{}", slice), move || async move {
                writer.write(tenant_id, slice, data, refreshed_at).await
            })
            .await
    }
}
