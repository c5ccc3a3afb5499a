//! Transit station classification

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::DomainError;

/// Kind of transit station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Underground / metro
    Metro,
    /// Commuter, regional or long-distance rail
    Train,
    /// Tram / light rail
    Tram,
    /// Bus stop
    Bus,
}

/// Priority class used by the nearest-station search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportPriority {
    /// Metro and train
    High,
    /// Tram and bus
    Low,
}

impl TransportType {
    /// Every station type
    pub const ALL: [Self; 4] = [Self::Metro, Self::Train, Self::Tram, Self::Bus];

    /// Priority class of this station type
    #[must_use]
    pub const fn priority(self) -> TransportPriority {
        match self {
            Self::Metro | Self::Train => TransportPriority::High,
            Self::Tram | Self::Bus => TransportPriority::Low,
        }
    }

    /// Lowercase label as stored and serialized
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metro => "metro",
            Self::Train => "train",
            Self::Tram => "tram",
            Self::Bus => "bus",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransportType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metro" | "subway" => Ok(Self::Metro),
            "train" | "rail" => Ok(Self::Train),
            "tram" | "light_rail" => Ok(Self::Tram),
            "bus" => Ok(Self::Bus),
            other => Err(DomainError::UnknownTransportType(other.to_string())),
        }
    }
}
