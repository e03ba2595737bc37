//! Contracts of the external collaborators the refresh engine talks to.
//!
//! Production implementations live in `clickhouse-client` and `cube-client`;
//! tests swap in recording mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::dashboard::{CacheKey, CachedDashboard};
use crate::error::Result;
use crate::query::{QueryRequest, QueryResponse};

/// Analytical query backend answering measure/dimension/filter queries.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn load(&self, request: &QueryRequest) -> Result<QueryResponse>;
}

/// Segment, activity, and watermark lookups.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// The tenant's default segment id, if it has one.
    async fn default_segment(&self, tenant_id: &str) -> Result<Option<String>>;

    /// Start time of the last completed refresh pass for a segment.
    async fn dashboard_last_refreshed_at(&self, segment_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Platforms with any activity in the given leaf segments.
    async fn active_platforms(&self, leaf_segment_ids: &[String]) -> Result<BTreeSet<String>>;

    /// Platforms with activity recorded strictly after `since`. Empty when nothing is new.
    async fn new_activity_platforms(
        &self,
        since: DateTime<Utc>,
        leaf_segment_ids: &[String],
    ) -> Result<BTreeSet<String>>;

    /// Record a completed pass. Never moves the stored watermark backwards.
    async fn advance_watermark(&self, segment_id: &str, refreshed_at: DateTime<Utc>) -> Result<()>;
}

/// Durable dashboard cache, one entry per slice key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Replace the entry for `key` wholesale.
    async fn write(&self, key: &CacheKey, entry: &CachedDashboard) -> Result<()>;

    async fn read(&self, key: &CacheKey) -> Result<Option<CachedDashboard>>;
}
