//! Internal telemetry for the dashboard cache.
//!
//! Counters and latency histograms live in process; the worker scheduler
//! logs periodic snapshots of them.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
