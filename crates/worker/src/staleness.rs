//! Staleness detection: whether a segment needs refreshing, and which platforms.

use chrono::{DateTime, Utc};
use dashboard_core::{ActivityStore, Platform, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Outcome of planning a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPlan {
    /// Platforms to recompute; always contains [`Platform::All`] unless skipping.
    pub platforms: BTreeSet<Platform>,
    pub skip: bool,
}

impl RefreshPlan {
    fn skip() -> Self {
        Self {
            platforms: BTreeSet::new(),
            skip: true,
        }
    }

    fn refresh(names: BTreeSet<String>) -> Self {
        let mut platforms: BTreeSet<Platform> = names.into_iter().map(Platform::named).collect();
        platforms.insert(Platform::All);
        Self {
            platforms,
            skip: false,
        }
    }
}

/// Decides which platform slices of a segment are stale.
#[derive(Clone)]
pub struct StalenessDetector {
    store: Arc<dyn ActivityStore>,
}

impl StalenessDetector {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    /// Plan a refresh given the segment's current watermark.
    ///
    /// Without a watermark every active platform is stale. With one, only
    /// platforms with activity strictly after it are, and none means skip.
    pub async fn plan_refresh(
        &self,
        segment_id: &str,
        watermark: Option<DateTime<Utc>>,
        leaf_segment_ids: &[String],
    ) -> Result<RefreshPlan> {
        let plan = match watermark {
            None => {
                let active = self.store.active_platforms(leaf_segment_ids).await?;
                debug!(
                    segment_id,
                    platforms = active.len(),
                    "Cold start, refreshing all platforms"
                );
                RefreshPlan::refresh(active)
            }
            Some(since) => {
                let fresh = self
                    .store
                    .new_activity_platforms(since, leaf_segment_ids)
                    .await?;
                if fresh.is_empty() {
                    debug!(segment_id, since = %since, "No new activity");
                    RefreshPlan::skip()
                } else {
                    debug!(
                        segment_id,
                        since = %since,
                        platforms = fresh.len(),
                        "New activity found"
                    );
                    RefreshPlan::refresh(fresh)
                }
            }
        };

        Ok(plan)
    }
}
