//! Walking distance and time estimates

use serde::{Deserialize, Serialize};

/// Street network detour relative to the straight line
pub const WALKING_DETOUR_FACTOR: f64 = 1.2;

/// Average walking speed in meters per second
pub const WALKING_SPEED_MPS: f64 = 1.39;

/// Estimated walk to a destination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkingEstimate {
    /// Walking distance in meters, 2 decimals
    pub distance_m: f64,
    /// Walking time in minutes, 1 decimal
    pub time_min: f64,
}

impl WalkingEstimate {
    /// Estimate from a straight-line distance
    #[must_use]
    pub fn from_linear(linear_distance_m: f64) -> Self {
        let distance_m = round_to(linear_distance_m * WALKING_DETOUR_FACTOR, 2);
        Self {
            distance_m,
            time_min: round_to(distance_m / WALKING_SPEED_MPS / 60.0, 1),
        }
    }

    /// Estimate from a routed distance and duration
    #[must_use]
    pub fn from_route(distance_m: f64, duration_s: f64) -> Self {
        Self {
            distance_m: round_to(distance_m, 2),
            time_min: round_to(duration_s / 60.0, 1),
        }
    }
}

/// Round half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
