//! Routing-matrix data models

use std::fmt;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Path segment form, longitude first
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// Raw Matrix API response
///
/// `distances` is in meters and `durations` in seconds; both are indexed
/// `[source][destination]` with `null` for pairs without a route.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixResponse {
    /// `"Ok"` on success, an error code otherwise
    pub code: String,
    /// Error description for non-`Ok` codes
    #[serde(default)]
    pub message: Option<String>,
    /// Pairwise distances
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f64>>>>,
    /// Pairwise durations
    #[serde(default)]
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}

impl MatrixResponse {
    /// Whether the service reported success
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// Pairwise distances (m) and durations (s), indexed `[origin][destination]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelMatrix {
    /// Distance rows
    pub distances: Vec<Vec<Option<f64>>>,
    /// Duration rows
    pub durations: Vec<Vec<Option<f64>>>,
}

impl TravelMatrix {
    /// Build a matrix of the expected shape from a raw response
    ///
    /// Missing annotations become rows of `None`; short rows are padded.
    #[must_use]
    pub fn from_response(response: MatrixResponse, origins: usize, destinations: usize) -> Self {
        Self {
            distances: shape(response.distances, origins, destinations),
            durations: shape(response.durations, origins, destinations),
        }
    }

    /// Distance from origin `o` to destination `d`, if routable
    #[must_use]
    pub fn distance(&self, o: usize, d: usize) -> Option<f64> {
        self.distances.get(o).and_then(|row| row.get(d).copied().flatten())
    }

    /// Duration from origin `o` to destination `d`, if routable
    #[must_use]
    pub fn duration(&self, o: usize, d: usize) -> Option<f64> {
        self.durations.get(o).and_then(|row| row.get(d).copied().flatten())
    }
}

fn shape(
    rows: Option<Vec<Vec<Option<f64>>>>,
    origins: usize,
    destinations: usize,
) -> Vec<Vec<Option<f64>>> {
    let mut rows = rows.unwrap_or_default();
    rows.resize_with(origins, Vec::new);
    rows.truncate(origins);
    for row in &mut rows {
        row.resize(destinations, None);
    }
    rows
}
