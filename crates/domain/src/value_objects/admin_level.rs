//! Administrative level of a boundary
//!
//! Levels follow the OpenStreetMap `admin_level` convention used by the
//! boundary store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative granularity, from country down to neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// admin_level 2
    Country,
    /// admin_level 4
    Region,
    /// admin_level 6
    Province,
    /// admin_level 8
    City,
    /// admin_level 9
    District,
    /// admin_level 10
    Neighborhood,
}

impl AdminLevel {
    /// All levels, least to most specific
    pub const ALL: [Self; 6] = [
        Self::Country,
        Self::Region,
        Self::Province,
        Self::City,
        Self::District,
        Self::Neighborhood,
    ];

    /// Levels a name search may seed from, most specific first
    pub const SEED_PRIORITY: [Self; 5] = [
        Self::Neighborhood,
        Self::District,
        Self::City,
        Self::Province,
        Self::Region,
    ];

    /// Numeric admin level code
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Country => 2,
            Self::Region => 4,
            Self::Province => 6,
            Self::City => 8,
            Self::District => 9,
            Self::Neighborhood => 10,
        }
    }

    /// Map a numeric admin level code; codes outside the hierarchy yield `None`
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            2 => Some(Self::Country),
            4 => Some(Self::Region),
            6 => Some(Self::Province),
            8 => Some(Self::City),
            9 => Some(Self::District),
            10 => Some(Self::Neighborhood),
            _ => None,
        }
    }

    /// Whether a populated level at this granularity makes a hierarchy usable
    ///
    /// District and neighborhood alone are too granular.
    #[must_use]
    pub const fn is_useful(self) -> bool {
        matches!(
            self,
            Self::Country | Self::Region | Self::Province | Self::City
        )
    }

    /// Lowercase label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Region => "region",
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
            Self::Neighborhood => "neighborhood",
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
