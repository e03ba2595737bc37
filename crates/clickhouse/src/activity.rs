//! ClickHouse-backed activity store: segments, platforms, and refresh watermarks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use dashboard_core::error::StoreErrorCode;
use dashboard_core::{ActivityStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::client::ClickHouseClient;

/// Watermark row for `dashboard_refresh`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DashboardRefreshRow {
    pub segment_id: String,
    pub refreshed_at: i64, // DateTime64(3) as milliseconds
}

/// Activity store reading segments and activities from ClickHouse.
#[derive(Clone)]
pub struct ClickHouseActivityStore {
    client: Arc<ClickHouseClient>,
}

impl ClickHouseActivityStore {
    pub fn new(client: Arc<ClickHouseClient>) -> Self {
        Self { client }
    }
}

fn read_error(what: &str, e: clickhouse::error::Error) -> Error {
    Error::store(StoreErrorCode::ReadFailed, format!("{} query error: {}", what, e))
}

/// Convert stored milliseconds back to a timestamp.
pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        Error::store(
            StoreErrorCode::ReadFailed,
            format!("stored timestamp out of range: {}", ms),
        )
    })
}

#[async_trait]
impl ActivityStore for ClickHouseActivityStore {
    async fn default_segment(&self, tenant_id: &str) -> Result<Option<String>> {
        self.client
            .inner()
            .query(
                "SELECT id FROM segments FINAL \
                 WHERE tenant_id = ? AND is_default = 1 \
                 ORDER BY created_at ASC LIMIT 1",
            )
            .bind(tenant_id)
            .fetch_optional::<String>()
            .await
            .map_err(|e| read_error("Default segment", e))
    }

    async fn dashboard_last_refreshed_at(&self, segment_id: &str) -> Result<Option<DateTime<Utc>>> {
        let latest = self
            .client
            .inner()
            .query(
                "SELECT toUnixTimestamp64Milli(refreshed_at) FROM dashboard_refresh \
                 WHERE segment_id = ? ORDER BY refreshed_at DESC LIMIT 1",
            )
            .bind(segment_id)
            .fetch_optional::<i64>()
            .await
            .map_err(|e| read_error("Watermark", e))?;

        latest.map(from_millis).transpose()
    }

    async fn active_platforms(&self, leaf_segment_ids: &[String]) -> Result<BTreeSet<String>> {
        let platforms = self
            .client
            .inner()
            .query(
                "SELECT DISTINCT platform FROM activities \
                 WHERE has(?, segment_id) AND platform != '' \
                 ORDER BY platform",
            )
            .bind(leaf_segment_ids)
            .fetch_all::<String>()
            .await
            .map_err(|e| read_error("Active platforms", e))?;

        Ok(platforms.into_iter().collect())
    }

    async fn new_activity_platforms(
        &self,
        since: DateTime<Utc>,
        leaf_segment_ids: &[String],
    ) -> Result<BTreeSet<String>> {
        let platforms = self
            .client
            .inner()
            .query(
                "SELECT DISTINCT platform FROM activities \
                 WHERE has(?, segment_id) AND platform != '' \
                   AND created_at > fromUnixTimestamp64Milli(?) \
                 ORDER BY platform",
            )
            .bind(leaf_segment_ids)
            .bind(since.timestamp_millis())
            .fetch_all::<String>()
            .await
            .map_err(|e| read_error("New activity platforms", e))?;

        debug!(since = %since, count = platforms.len(), "Found platforms with new activity");
        Ok(platforms.into_iter().collect())
    }

    async fn advance_watermark(&self, segment_id: &str, refreshed_at: DateTime<Utc>) -> Result<()> {
        // Readers take the newest version, so an older insert never moves the watermark back
        let row = DashboardRefreshRow {
            segment_id: segment_id.to_string(),
            refreshed_at: refreshed_at.timestamp_millis(),
        };

        let write_error = |e: clickhouse::error::Error| {
            Error::store(
                StoreErrorCode::WatermarkWriteFailed,
                format!("Watermark write error: {}", e),
            )
        };

        let mut insert = self
            .client
            .inner()
            .insert("dashboard_refresh")
            .map_err(write_error)?;
        insert.write(&row).await.map_err(write_error)?;
        insert.end().await.map_err(write_error)?;

        Ok(())
    }
}
