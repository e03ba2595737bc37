//! Tenant and segment scoping types.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Resolved segment scope for one refresh run.
///
/// `segment_id` addresses cache entries and the watermark; the leaf ids are
/// the segments whose data is actually queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentScope {
    pub tenant_id: String,
    pub segment_id: String,
    pub leaf_segment_ids: Vec<String>,
}

impl SegmentScope {
    pub fn new(
        tenant_id: impl Into<String>,
        segment_id: impl Into<String>,
        leaf_segment_ids: Vec<String>,
    ) -> Self {
        let segment_id = segment_id.into();
        let leaf_segment_ids = if leaf_segment_ids.is_empty() {
            vec![segment_id.clone()]
        } else {
            leaf_segment_ids
        };

        Self {
            tenant_id: tenant_id.into(),
            segment_id,
            leaf_segment_ids,
        }
    }

    /// Scope where the segment is its own only leaf.
    pub fn single(tenant_id: impl Into<String>, segment_id: impl Into<String>) -> Self {
        Self::new(tenant_id, segment_id, Vec::new())
    }
}

/// Request to refresh the dashboard cache of one tenant segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Tenant owning the segment
    #[validate(length(min = 1, max = 128))]
    pub tenant_id: String,
    /// Segment to refresh; the tenant's default segment when absent
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub segment_id: Option<String>,
    /// Leaf segments to aggregate over; the segment itself when empty
    #[serde(default)]
    pub leaf_segment_ids: Vec<String>,
}

impl RefreshRequest {
    /// Refresh the tenant's default segment.
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Self::default()
        }
    }

    pub fn with_segment(
        mut self,
        segment_id: impl Into<String>,
        leaf_segment_ids: Vec<String>,
    ) -> Self {
        self.segment_id = Some(segment_id.into());
        self.leaf_segment_ids = leaf_segment_ids;
        self
    }
}
