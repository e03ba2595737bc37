//! Core types, timeframes, and store contracts for the dashboard cache.

pub mod dashboard;
pub mod error;
pub mod family;
pub mod platform;
pub mod query;
pub mod store;
pub mod tenant;
pub mod timeframe;

pub use dashboard::*;
pub use error::{Error, Result};
pub use family::{Breakdown, MetricFamily};
pub use platform::*;
pub use query::{Granularity, OrderDirection, QueryFilter, QueryRequest, QueryResponse, ResultRow};
pub use store::*;
pub use tenant::*;
pub use timeframe::*;
