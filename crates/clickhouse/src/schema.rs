//! ClickHouse table schemas.
//!
//! - `segments` and `activities` are read by the refresh engine only
//! - `dashboard_cache` holds one logical row per slice key
//! - `dashboard_refresh` holds the per-segment refresh watermark
//!
//! Both written tables are ReplacingMergeTree versioned by refresh time, and
//! every read uses `FINAL` or picks the newest version explicitly.

use crate::client::ClickHouseClient;
use dashboard_core::{Error, Result};

/// SQL for creating the database.
pub const CREATE_DATABASE: &str = r#"
CREATE DATABASE IF NOT EXISTS dashboard
"#;

/// SQL for creating the segments table.
pub const CREATE_SEGMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dashboard.segments (
    id String,
    tenant_id String,
    name String,
    is_default UInt8 DEFAULT 0,
    created_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = ReplacingMergeTree(created_at)
ORDER BY (tenant_id, id)
"#;

/// SQL for creating the activities table.
///
/// `created_at` is the ingestion time and drives staleness detection.
pub const CREATE_ACTIVITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dashboard.activities (
    id String,
    tenant_id String,
    segment_id String,
    platform LowCardinality(String),
    type LowCardinality(String),
    timestamp DateTime64(3),
    created_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(created_at)
ORDER BY (segment_id, created_at, id)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the dashboard cache table.
pub const CREATE_DASHBOARD_CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dashboard.dashboard_cache (
    tenant_id String,
    segment_id String,
    timeframe LowCardinality(String),
    platform LowCardinality(String),
    -- Serialized DashboardData JSON
    data String,
    refreshed_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(refreshed_at)
ORDER BY (tenant_id, segment_id, timeframe, platform)
"#;

/// SQL for creating the refresh watermark table.
pub const CREATE_DASHBOARD_REFRESH_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dashboard.dashboard_refresh (
    segment_id String,
    refreshed_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(refreshed_at)
ORDER BY segment_id
"#;

/// All table creation statements.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_DATABASE,
        CREATE_SEGMENTS_TABLE,
        CREATE_ACTIVITIES_TABLE,
        CREATE_DASHBOARD_CACHE_TABLE,
        CREATE_DASHBOARD_REFRESH_TABLE,
    ]
}

/// Initialize the database schema.
///
/// Creates the database and all tables if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for sql in all_tables() {
        client
            .inner()
            .query(sql)
            .execute()
            .await
            .map_err(|e| Error::internal(format!("Schema init error: {}", e)))?;
    }
    Ok(())
}
