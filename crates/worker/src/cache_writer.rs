//! Cache writer: slice writes and the refresh watermark.

use chrono::{DateTime, Utc};
use dashboard_core::{
    ActivityStore, CacheKey, CacheStore, CachedDashboard, DashboardData, Result, Slice,
};
use std::sync::Arc;
use telemetry::metrics;
use tracing::debug;

/// Persists computed slices and advances the per-segment watermark.
#[derive(Clone)]
pub struct CacheWriter {
    cache: Arc<dyn CacheStore>,
    activity: Arc<dyn ActivityStore>,
}

impl CacheWriter {
    pub fn new(cache: Arc<dyn CacheStore>, activity: Arc<dyn ActivityStore>) -> Self {
        Self { cache, activity }
    }

    /// Overwrite the entry for `slice`. Writing the same data twice leaves the same entry.
    pub async fn write(
        &self,
        tenant_id: &str,
        slice: &Slice,
        data: &DashboardData,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let key = CacheKey::for_slice(tenant_id, slice);
        let entry = CachedDashboard {
            data: data.clone(),
            refreshed_at,
        };

        self.cache.write(&key, &entry).await?;
        metrics().slices_written.inc();
        debug!(key = %key, "Cached slice");
        Ok(())
    }

    /// Record a completed pass. Only called once every slice of the pass is written.
    pub async fn advance_watermark(
        &self,
        segment_id: &str,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.activity.advance_watermark(segment_id, refreshed_at).await?;
        metrics().watermark_advances.inc();
        debug!(segment_id, refreshed_at = %refreshed_at, "Advanced refresh watermark");
        Ok(())
    }
}
