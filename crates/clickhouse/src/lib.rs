//! ClickHouse stores for the dashboard cache.
//!
//! Activity lookups and the refresh watermark live in [`activity`], the
//! per-slice dashboard cache in [`cache`].

pub mod activity;
pub mod cache;
pub mod client;
pub mod config;
pub mod health;
pub mod schema;

pub use activity::{ClickHouseActivityStore, DashboardRefreshRow};
pub use cache::{ClickHouseCacheStore, DashboardCacheRow};
pub use client::*;
pub use config::*;
