//! Transit station store port

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{GeoLocation, LineInfo, StationCandidate};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for station and line lookups
///
/// Station queries return candidates of every transport type; the priority
/// rule is applied by the caller.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransportStore: Send + Sync {
    /// Up to `limit` nearest stations of each priority class within `radius_m`, nearest first
    async fn nearest_by_priority(
        &self,
        location: GeoLocation,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<StationCandidate>, ApplicationError>;

    /// Same as [`Self::nearest_by_priority`] for many points in one round trip
    ///
    /// The returned vector is index-aligned with `points`.
    async fn nearest_by_priority_batch(
        &self,
        points: &[GeoLocation],
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<Vec<StationCandidate>>, ApplicationError>;

    /// Lines serving one station
    async fn lines_by_station_id(&self, station_id: i64) -> Result<Vec<LineInfo>, ApplicationError>;

    /// Lines for many stations in one round trip, keyed by station id
    async fn lines_by_station_ids(
        &self,
        station_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<LineInfo>>, ApplicationError>;
}
