//! Internal metrics collection.
//!
//! Lock-free counters and histograms shared by every refresh run in the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        // Saturate at zero so a stray dec cannot wrap
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 30s, 60s, 300s, +inf
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [
        10,
        50,
        100,
        250,
        500,
        1_000,
        5_000,
        30_000,
        60_000,
        300_000,
        u64::MAX,
    ];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    /// Returns (upper bound, count) per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the dashboard cache.
#[derive(Debug, Default)]
pub struct Metrics {
    // Refresh runs
    pub refresh_runs_started: Counter,
    pub refresh_runs_skipped: Counter,
    pub refresh_runs_completed: Counter,
    pub refresh_runs_failed: Counter,
    pub refreshes_in_flight: Gauge,

    // Slices and watermarks
    pub slices_written: Counter,
    pub watermark_advances: Counter,

    // Query backend
    pub queries_issued: Counter,
    pub query_errors: Counter,

    // Step execution
    pub step_retries: Counter,
    pub step_timeouts: Counter,

    // Latency histograms
    pub query_latency_ms: Histogram,
    pub slice_latency_ms: Histogram,
    pub run_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub refresh_runs_started: u64,
    pub refresh_runs_skipped: u64,
    pub refresh_runs_completed: u64,
    pub refresh_runs_failed: u64,
    pub refreshes_in_flight: u64,
    pub slices_written: u64,
    pub watermark_advances: u64,
    pub queries_issued: u64,
    pub query_errors: u64,
    pub step_retries: u64,
    pub step_timeouts: u64,
    pub query_latency_mean_ms: f64,
    pub slice_latency_mean_ms: f64,
    pub run_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            refresh_runs_started: self.refresh_runs_started.get(),
            refresh_runs_skipped: self.refresh_runs_skipped.get(),
            refresh_runs_completed: self.refresh_runs_completed.get(),
            refresh_runs_failed: self.refresh_runs_failed.get(),
            refreshes_in_flight: self.refreshes_in_flight.get(),
            slices_written: self.slices_written.get(),
            watermark_advances: self.watermark_advances.get(),
            queries_issued: self.queries_issued.get(),
            query_errors: self.query_errors.get(),
            step_retries: self.step_retries.get(),
            step_timeouts: self.step_timeouts.get(),
            query_latency_mean_ms: self.query_latency_ms.mean(),
            slice_latency_mean_ms: self.slice_latency_ms.mean(),
            run_latency_mean_ms: self.run_latency_ms.mean(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
