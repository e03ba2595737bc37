//! In-memory dashboard cache backed by moka.
//!
//! The cache is unbounded: an evicted slice would be a permanent hole, since
//! the watermark says it was refreshed and staleness detection never looks
//! at the cache. Pair it with [`ProcessWatermarkStore`] so a restart that
//! empties the cache also forgets the watermark and triggers a cold start.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashboard_core::{ActivityStore, CacheKey, CacheStore, CachedDashboard, Result};
use moka::future::Cache;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Cache store kept in process memory. Contents are lost on restart.
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Cache<CacheKey, CachedDashboard>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Every stored entry. Order is unspecified.
    pub fn entries(&self) -> Vec<(CacheKey, CachedDashboard)> {
        self.entries
            .iter()
            .map(|(key, entry)| ((*key).clone(), entry))
            .collect()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn write(&self, key: &CacheKey, entry: &CachedDashboard) -> Result<()> {
        self.entries.insert(key.clone(), entry.clone()).await;
        Ok(())
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CachedDashboard>> {
        Ok(self.entries.get(key).await)
    }
}

/// Activity store whose watermarks live in process memory.
///
/// Segment and activity lookups go to the wrapped store; watermarks are
/// never read from or written to it.
pub struct ProcessWatermarkStore {
    inner: Arc<dyn ActivityStore>,
    watermarks: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ProcessWatermarkStore {
    pub fn new(inner: Arc<dyn ActivityStore>) -> Self {
        Self {
            inner,
            watermarks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ActivityStore for ProcessWatermarkStore {
    async fn default_segment(&self, tenant_id: &str) -> Result<Option<String>> {
        self.inner.default_segment(tenant_id).await
    }

    async fn dashboard_last_refreshed_at(&self, segment_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.watermarks.lock().get(segment_id).copied())
    }

    async fn active_platforms(&self, leaf_segment_ids: &[String]) -> Result<BTreeSet<String>> {
        self.inner.active_platforms(leaf_segment_ids).await
    }

    async fn new_activity_platforms(
        &self,
        since: DateTime<Utc>,
        leaf_segment_ids: &[String],
    ) -> Result<BTreeSet<String>> {
        self.inner
            .new_activity_platforms(since, leaf_segment_ids)
            .await
    }

    async fn advance_watermark(&self, segment_id: &str, refreshed_at: DateTime<Utc>) -> Result<()> {
        let mut watermarks = self.watermarks.lock();
        let current = watermarks
            .entry(segment_id.to_string())
            .or_insert(refreshed_at);
        if refreshed_at > *current {
            *current = refreshed_at;
        }
        Ok(())
    }
}
