//! Metric families and the analytical members they query.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Member names understood by the query backend.
pub mod members {
    pub const MEMBER_COUNT: &str = "Members.count";
    pub const ORGANIZATION_COUNT: &str = "Organizations.count";
    pub const ACTIVITY_COUNT: &str = "Activities.count";

    pub const MEMBER_JOINED_AT: &str = "Members.joinedAt";
    pub const ORGANIZATION_JOINED_AT: &str = "Organizations.joinedAt";
    pub const ACTIVITY_DATE: &str = "Activities.date";

    pub const IS_TEAM_MEMBER: &str = "Members.isTeamMember";
    pub const IS_BOT: &str = "Members.isBot";
    pub const IS_ORGANIZATION: &str = "Members.isOrganization";
    pub const ACTIVITY_PLATFORM: &str = "Activities.platform";
    pub const SEGMENTS_ID: &str = "Segments.id";

    pub const ACTIVITY_SENTIMENT_MOOD: &str = "Activities.sentimentMood";
    pub const ACTIVITY_TYPE: &str = "Activities.type";
}

/// Breakdown of the activity family by extra dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Breakdown {
    BySentimentMood,
    ByTypeAndPlatform,
}

impl Breakdown {
    pub fn dimensions(&self) -> &'static [&'static str] {
        match self {
            Self::BySentimentMood => &[members::ACTIVITY_SENTIMENT_MOOD],
            Self::ByTypeAndPlatform => &[members::ACTIVITY_TYPE, members::ACTIVITY_PLATFORM],
        }
    }
}

/// One tracked dashboard measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricFamily {
    /// Members whose join date falls in the period
    NewMembers,
    /// Members with at least one activity in the period
    ActiveMembers,
    /// Organizations whose join date falls in the period
    NewOrganizations,
    /// Organizations with at least one member activity in the period
    ActiveOrganizations,
    /// Activity volume, with sentiment and type/platform breakdowns
    Activities,
}

impl MetricFamily {
    /// Every family, in computation order.
    pub const ALL: [MetricFamily; 5] = [
        Self::NewMembers,
        Self::ActiveMembers,
        Self::NewOrganizations,
        Self::ActiveOrganizations,
        Self::Activities,
    ];

    pub fn measure(&self) -> &'static str {
        match self {
            Self::NewMembers | Self::ActiveMembers => members::MEMBER_COUNT,
            Self::NewOrganizations | Self::ActiveOrganizations => members::ORGANIZATION_COUNT,
            Self::Activities => members::ACTIVITY_COUNT,
        }
    }

    pub fn time_dimension(&self) -> &'static str {
        match self {
            Self::NewMembers => members::MEMBER_JOINED_AT,
            Self::NewOrganizations => members::ORGANIZATION_JOINED_AT,
            Self::ActiveMembers | Self::ActiveOrganizations | Self::Activities => {
                members::ACTIVITY_DATE
            }
        }
    }

    pub fn breakdowns(&self) -> &'static [Breakdown] {
        match self {
            Self::Activities => &[Breakdown::BySentimentMood, Breakdown::ByTypeAndPlatform],
            _ => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewMembers => "newMembers",
            Self::ActiveMembers => "activeMembers",
            Self::NewOrganizations => "newOrganizations",
            Self::ActiveOrganizations => "activeOrganizations",
            Self::Activities => "activity",
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
