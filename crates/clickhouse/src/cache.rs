//! ClickHouse-backed dashboard cache.

use async_trait::async_trait;
use clickhouse::Row;
use dashboard_core::error::StoreErrorCode;
use dashboard_core::{CacheKey, CacheStore, CachedDashboard, DashboardData, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::activity::from_millis;
use crate::client::ClickHouseClient;

/// Row in `dashboard_cache`. `data` carries the serialized dashboard JSON.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DashboardCacheRow {
    pub tenant_id: String,
    pub segment_id: String,
    pub timeframe: String,
    pub platform: String,
    pub data: String,
    pub refreshed_at: i64,
}

impl DashboardCacheRow {
    pub fn from_entry(key: &CacheKey, entry: &CachedDashboard) -> Result<Self> {
        Ok(Self {
            tenant_id: key.tenant_id.clone(),
            segment_id: key.segment_id.clone(),
            timeframe: key.timeframe.as_str().to_string(),
            platform: key.platform.as_str().to_string(),
            data: serde_json::to_string(&entry.data)?,
            refreshed_at: entry.refreshed_at.timestamp_millis(),
        })
    }

    pub fn into_entry(self) -> Result<CachedDashboard> {
        let data: DashboardData = serde_json::from_str(&self.data)?;
        Ok(CachedDashboard {
            data,
            refreshed_at: from_millis(self.refreshed_at)?,
        })
    }
}

/// Cache store persisting one row per slice key.
#[derive(Clone)]
pub struct ClickHouseCacheStore {
    client: Arc<ClickHouseClient>,
}

impl ClickHouseCacheStore {
    pub fn new(client: Arc<ClickHouseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheStore for ClickHouseCacheStore {
    async fn write(&self, key: &CacheKey, entry: &CachedDashboard) -> Result<()> {
        let row = DashboardCacheRow::from_entry(key, entry)?;

        let write_error = |e: clickhouse::error::Error| {
            Error::store(
                StoreErrorCode::CacheWriteFailed,
                format!("Cache write error for {}: {}", key, e),
            )
        };

        let mut insert = self
            .client
            .inner()
            .insert("dashboard_cache")
            .map_err(write_error)?;
        insert.write(&row).await.map_err(write_error)?;
        insert.end().await.map_err(write_error)?;

        debug!(key = %key, "Wrote dashboard cache row");
        Ok(())
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CachedDashboard>> {
        let row = self
            .client
            .inner()
            .query(
                "SELECT ?fields FROM dashboard_cache FINAL \
                 WHERE tenant_id = ? AND segment_id = ? AND timeframe = ? AND platform = ? \
                 LIMIT 1",
            )
            .bind(&key.tenant_id)
            .bind(&key.segment_id)
            .bind(key.timeframe.as_str())
            .bind(key.platform.as_str())
            .fetch_optional::<DashboardCacheRow>()
            .await
            .map_err(|e| {
                Error::store(
                    StoreErrorCode::ReadFailed,
                    format!("Cache read error for {}: {}", key, e),
                )
            })?;

        row.map(DashboardCacheRow::into_entry).transpose()
    }
}
