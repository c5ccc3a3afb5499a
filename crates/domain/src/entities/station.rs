//! Transit stations and the lines serving them

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::value_objects::{GeoLocation, TransportType, WalkingEstimate, round_to};

/// A station row returned by the transport store, before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct StationCandidate {
    pub id: i64,
    pub name: String,
    pub transport_type: TransportType,
    pub location: GeoLocation,
}

/// A line serving a station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInfo {
    pub id: i64,
    pub name: String,
    /// Short public reference such as `L3` or `V15`; may be empty
    #[serde(rename = "ref")]
    pub line_ref: String,
    /// Raw route type from the store (`subway`, `bus`, ...)
    #[serde(rename = "type")]
    pub line_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A station near an enriched location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    pub id: i64,
    pub name: String,
    pub transport_type: TransportType,
    pub latitude: f64,
    pub longitude: f64,
    /// Straight-line distance in meters
    pub distance_m: f64,
    pub walking_distance_m: f64,
    pub walking_time_min: f64,
    #[serde(default)]
    pub lines: Vec<LineInfo>,
}

impl NearbyStation {
    /// Build from a candidate, estimating the walk from `origin`
    #[must_use]
    pub fn from_candidate(candidate: StationCandidate, origin: &GeoLocation) -> Self {
        let linear = round_to(origin.distance_m(&candidate.location), 2);
        let estimate = WalkingEstimate::from_linear(linear);
        Self {
            id: candidate.id,
            name: candidate.name,
            transport_type: candidate.transport_type,
            latitude: candidate.location.latitude(),
            longitude: candidate.location.longitude(),
            distance_m: linear,
            walking_distance_m: estimate.distance_m,
            walking_time_min: estimate.time_min,
            lines: Vec::new(),
        }
    }

    /// Station coordinates
    #[must_use]
    pub const fn location(&self) -> GeoLocation {
        GeoLocation::new_unchecked(self.latitude, self.longitude)
    }

    /// Replace the walking estimate
    pub const fn set_walking(&mut self, estimate: WalkingEstimate) {
        self.walking_distance_m = estimate.distance_m;
        self.walking_time_min = estimate.time_min;
    }
}

/// Deduplication key for station names: alphanumeric characters only, case preserved
#[must_use]
pub fn normalized_name_key(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Drop stations whose normalized name was already seen, keeping the first occurrence
///
/// Collapses duplicate platform and exit records of the same station. Names
/// without any alphanumeric character are never merged.
#[must_use]
pub fn dedup_stations(stations: Vec<NearbyStation>) -> Vec<NearbyStation> {
    let mut seen = HashSet::new();
    stations
        .into_iter()
        .filter(|station| {
            let key = normalized_name_key(&station.name);
            key.is_empty() || seen.insert(key)
        })
        .collect()
}

/// Drop lines whose non-empty `ref` was already seen
///
/// Keeps one direction of bidirectional lines; lines without a ref are kept.
#[must_use]
pub fn dedup_lines(lines: Vec<LineInfo>) -> Vec<LineInfo> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|line| line.line_ref.is_empty() || seen.insert(line.line_ref.clone()))
        .collect()
}
