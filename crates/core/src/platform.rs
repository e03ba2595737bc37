//! Platform dimension for dashboard slices.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel identifier for the unfiltered view.
pub const ALL_PLATFORMS: &str = "all";

/// A source platform, or every platform at once.
///
/// `All` sorts before any named platform, so the unfiltered slice is
/// always refreshed first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    All,
    Named(String),
}

impl Platform {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == ALL_PLATFORMS {
            Self::All
        } else {
            Self::Named(name)
        }
    }

    /// Parse an optional query value; missing or empty means unfiltered.
    pub fn from_optional(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::All,
            Some(name) => Self::named(name),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// The platform to filter on, if any.
    pub fn filter_value(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(name) => Some(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_PLATFORMS,
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::named(raw))
    }
}
