//! Dashboard cache refresh engine.
//!
//! - Aggregator (metric families over the query backend)
//! - Staleness detection (which platform slices are stale)
//! - Cache writer (slice writes, watermark)
//! - Orchestrator (one refresh run, step by step)
//! - Scheduler (periodic refresh rounds)

pub mod aggregator;
pub mod cache_writer;
pub mod config;
pub mod memory_store;
pub mod orchestrator;
pub mod scheduler;
pub mod staleness;
pub mod step;

pub use aggregator::MetricAggregator;
pub use cache_writer::CacheWriter;
pub use config::*;
pub use memory_store::{MemoryCacheStore, ProcessWatermarkStore};
pub use orchestrator::*;
pub use scheduler::*;
pub use staleness::*;
pub use step::*;
