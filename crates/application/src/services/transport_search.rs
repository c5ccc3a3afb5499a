//! Priority-ordered nearest-transport search
//!
//! High-priority stations (metro, train) win outright: if any is within the
//! radius, buses and trams are not returned at all.

use std::collections::HashSet;
use std::sync::Arc;

use domain::{
    GeoLocation, NearbyStation, StationCandidate, TransportPriority, dedup_lines, dedup_stations,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ApplicationError;
use crate::ports::TransportStore;

/// Default search radius in meters
pub const DEFAULT_RADIUS_M: f64 = 1500.0;

/// Default number of stations returned
pub const DEFAULT_LIMIT: usize = 5;

/// Candidates fetched per requested station, leaving room for deduplication
const OVERFETCH_FACTOR: usize = 4;

/// Search defaults used by the enrichment pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSearchConfig {
    /// Search radius in meters (default: 1500)
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,

    /// Maximum stations per location (default: 5)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_radius_m() -> f64 {
    DEFAULT_RADIUS_M
}

const fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for TransportSearchConfig {
    fn default() -> Self {
        Self {
            radius_m: default_radius_m(),
            limit: default_limit(),
        }
    }
}

impl TransportSearchConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return Err("transport radius_m must be a positive number".to_string());
        }
        if self.limit == 0 {
            return Err("transport limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Finds nearby stations with type-based priority
pub struct PriorityTransportSearch {
    store: Arc<dyn TransportStore>,
    config: TransportSearchConfig,
}

impl std::fmt::Debug for PriorityTransportSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityTransportSearch")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PriorityTransportSearch {
    /// Create a search with default radius and limit
    #[must_use]
    pub fn new(store: Arc<dyn TransportStore>) -> Self {
        Self {
            store,
            config: TransportSearchConfig::default(),
        }
    }

    /// Set the search defaults
    #[must_use]
    pub fn with_config(mut self, config: TransportSearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Search defaults in use
    #[must_use]
    pub const fn config(&self) -> &TransportSearchConfig {
        &self.config
    }

    /// Nearby stations around `(latitude, longitude)`
    ///
    /// Nearest first, at most `limit`, deduplicated by name, each with its
    /// deduplicated lines.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for invalid coordinates, radius or limit (checked before
    /// any store call); `UpstreamUnavailable` when the store fails.
    #[instrument(skip(self))]
    pub async fn find_priority(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStation>, ApplicationError> {
        validate_query(radius_m, limit)?;
        let origin = GeoLocation::new(latitude, longitude).map_err(domain::DomainError::from)?;

        let candidates = self
            .store
            .nearest_by_priority(origin, radius_m, limit.saturating_mul(OVERFETCH_FACTOR))
            .await?;
        let stations = rank_candidates(candidates, &origin, radius_m, limit);

        let line_sets = try_join_all(
            stations
                .iter()
                .map(|station| self.store.lines_by_station_id(station.id)),
        )
        .await?;

        let stations: Vec<NearbyStation> = stations
            .into_iter()
            .zip(line_sets)
            .map(|(mut station, lines)| {
                station.lines = dedup_lines(lines);
                station
            })
            .collect();
        debug!(count = stations.len(), "Nearby stations found");
        Ok(stations)
    }

    /// [`Self::find_priority`] with the configured radius and limit
    pub async fn find_nearby(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<NearbyStation>, ApplicationError> {
        self.find_priority(
            location.latitude(),
            location.longitude(),
            self.config.radius_m,
            self.config.limit,
        )
        .await
    }

    /// Nearby stations for many points: one station query and one line query in total
    ///
    /// The output is index-aligned with `points`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an invalid radius or limit; `UpstreamUnavailable`
    /// when either store call fails.
    #[instrument(skip(self, points), fields(count = points.len()))]
    pub async fn find_priority_batch(
        &self,
        points: &[GeoLocation],
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<Vec<NearbyStation>>, ApplicationError> {
        validate_query(radius_m, limit)?;
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .nearest_by_priority_batch(points, radius_m, limit.saturating_mul(OVERFETCH_FACTOR))
            .await?;
        let mut grouped: Vec<Vec<NearbyStation>> = points
            .iter()
            .enumerate()
            .map(|(index, origin)| {
                let candidates = rows.get(index).cloned().unwrap_or_default();
                rank_candidates(candidates, origin, radius_m, limit)
            })
            .collect();

        let mut seen = HashSet::new();
        let station_ids: Vec<i64> = grouped
            .iter()
            .flatten()
            .map(|station| station.id)
            .filter(|id| seen.insert(*id))
            .collect();
        if station_ids.is_empty() {
            return Ok(grouped);
        }

        let lines = self.store.lines_by_station_ids(&station_ids).await?;
        for station in grouped.iter_mut().flatten() {
            let station_lines = lines.get(&station.id).cloned().unwrap_or_default();
            station.lines = dedup_lines(station_lines);
        }
        Ok(grouped)
    }

    /// [`Self::find_priority_batch`] with the configured radius and limit
    pub async fn find_nearby_batch(
        &self,
        points: &[GeoLocation],
    ) -> Result<Vec<Vec<NearbyStation>>, ApplicationError> {
        self.find_priority_batch(points, self.config.radius_m, self.config.limit)
            .await
    }
}

fn validate_query(radius_m: f64, limit: usize) -> Result<(), ApplicationError> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(ApplicationError::InvalidInput(format!(
            "radius must be a positive number of meters, got {radius_m}"
        )));
    }
    if limit == 0 {
        return Err(ApplicationError::InvalidInput(
            "limit must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Apply the priority filter, order by distance, dedup by name and truncate
fn rank_candidates(
    candidates: Vec<StationCandidate>,
    origin: &GeoLocation,
    radius_m: f64,
    limit: usize,
) -> Vec<NearbyStation> {
    let mut stations: Vec<NearbyStation> = candidates
        .into_iter()
        .map(|candidate| NearbyStation::from_candidate(candidate, origin))
        .filter(|station| station.distance_m <= radius_m)
        .collect();

    let class = if stations
        .iter()
        .any(|s| s.transport_type.priority() == TransportPriority::High)
    {
        TransportPriority::High
    } else {
        TransportPriority::Low
    };
    stations.retain(|s| s.transport_type.priority() == class);
    stations.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then(a.id.cmp(&b.id)));

    let mut stations = dedup_stations(stations);
    stations.truncate(limit);
    stations
}
