//! Dashboard snapshots, slices, and cache keys.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::family::{Breakdown, MetricFamily};
use crate::platform::Platform;
use crate::timeframe::Timeframe;

/// One bucket of a daily timeseries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: NaiveDate,
    pub value: u64,
    /// Breakdown dimension values, empty for plain timeseries.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: BTreeMap<String, String>,
}

/// Computed values of one metric family for one slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub total: u64,
    pub previous_period_total: u64,
    pub timeseries: Vec<TimeseriesPoint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdowns: BTreeMap<Breakdown, Vec<TimeseriesPoint>>,
}

/// Every metric family for one slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub new_members: MetricSnapshot,
    pub active_members: MetricSnapshot,
    pub new_organizations: MetricSnapshot,
    pub active_organizations: MetricSnapshot,
    pub activity: MetricSnapshot,
}

impl DashboardData {
    pub fn family(&self, family: MetricFamily) -> &MetricSnapshot {
        match family {
            MetricFamily::NewMembers => &self.new_members,
            MetricFamily::ActiveMembers => &self.active_members,
            MetricFamily::NewOrganizations => &self.new_organizations,
            MetricFamily::ActiveOrganizations => &self.active_organizations,
            MetricFamily::Activities => &self.activity,
        }
    }

    pub fn set_family(&mut self, family: MetricFamily, snapshot: MetricSnapshot) {
        match family {
            MetricFamily::NewMembers => self.new_members = snapshot,
            MetricFamily::ActiveMembers => self.active_members = snapshot,
            MetricFamily::NewOrganizations => self.new_organizations = snapshot,
            MetricFamily::ActiveOrganizations => self.active_organizations = snapshot,
            MetricFamily::Activities => self.activity = snapshot,
        }
    }
}

/// Unit of refresh: one segment viewed in one timeframe on one platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice {
    pub segment_id: String,
    pub timeframe: Timeframe,
    pub platform: Platform,
}

impl Slice {
    pub fn new(segment_id: impl Into<String>, timeframe: Timeframe, platform: Platform) -> Self {
        Self {
            segment_id: segment_id.into(),
            timeframe,
            platform,
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.segment_id, self.timeframe, self.platform)
    }
}

/// Cache address of a slice within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub tenant_id: String,
    pub segment_id: String,
    pub timeframe: Timeframe,
    pub platform: Platform,
}

impl CacheKey {
    pub fn new(
        tenant_id: impl Into<String>,
        segment_id: impl Into<String>,
        timeframe: Timeframe,
        platform: Platform,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            segment_id: segment_id.into(),
            timeframe,
            platform,
        }
    }

    pub fn for_slice(tenant_id: impl Into<String>, slice: &Slice) -> Self {
        Self::new(
            tenant_id,
            slice.segment_id.clone(),
            slice.timeframe,
            slice.platform.clone(),
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.tenant_id, self.segment_id, self.timeframe, self.platform
        )
    }
}

/// A stored cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDashboard {
    pub data: DashboardData,
    /// Start time of the pass that produced `data`.
    pub refreshed_at: DateTime<Utc>,
}
