//! In-memory store fakes shared by the service tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use domain::{
    AdminBoundary, AdminLevel, GeoLocation, LineInfo, StationCandidate, TransportPriority,
    TransportType,
};

use crate::error::ApplicationError;
use crate::ports::{BoundaryStore, NameSearchHit, NameSearchTerm, TransportStore};

/// Plaça de Catalunya
pub const BARCELONA: GeoLocation = GeoLocation::new_unchecked(41.3851, 2.1734);

/// Boundary store keeping everything in maps; point containment is a circle per boundary
#[derive(Debug, Default)]
pub struct InMemoryBoundaryStore {
    boundaries: HashMap<i64, AdminBoundary>,
    areas: Vec<(i64, GeoLocation, f64)>,
    pub name_calls: AtomicUsize,
    pub id_calls: AtomicUsize,
    pub point_calls: AtomicUsize,
    pub points_batch_calls: AtomicUsize,
    pub names_batch_calls: AtomicUsize,
}

impl InMemoryBoundaryStore {
    pub fn insert(&mut self, boundary: AdminBoundary) {
        self.boundaries.insert(boundary.id, boundary);
    }

    pub fn insert_area(&mut self, boundary: AdminBoundary, center: GeoLocation, radius_m: f64) {
        self.areas.push((boundary.id, center, radius_m));
        self.insert(boundary);
    }

    fn find(&self, name: &str, level: AdminLevel) -> Option<AdminBoundary> {
        let mut matches: Vec<&AdminBoundary> = self
            .boundaries
            .values()
            .filter(|b| b.admin_level == level.code())
            .filter(|b| {
                b.name.eq_ignore_ascii_case(name)
                    || b.translations.values().any(|t| t.eq_ignore_ascii_case(name))
            })
            .collect();
        matches.sort_by_key(|b| b.id);
        matches.first().map(|b| (*b).clone())
    }

    fn containing(&self, point: &GeoLocation) -> Vec<AdminBoundary> {
        let mut found: Vec<AdminBoundary> = self
            .areas
            .iter()
            .filter(|(_, center, radius)| center.distance_m(point) <= *radius)
            .filter_map(|(id, _, _)| self.boundaries.get(id).cloned())
            .collect();
        found.sort_by_key(|b| b.admin_level);
        found
    }
}

#[async_trait]
impl BoundaryStore for InMemoryBoundaryStore {
    async fn search_by_name(
        &self,
        name: &str,
        level: AdminLevel,
        limit: usize,
    ) -> Result<Vec<AdminBoundary>, ApplicationError> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.find(name, level).into_iter().take(limit).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminBoundary>, ApplicationError> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.boundaries.get(&id).cloned())
    }

    async fn get_by_point(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<AdminBoundary>, ApplicationError> {
        self.point_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.containing(&location))
    }

    async fn get_by_points(
        &self,
        points: &[GeoLocation],
    ) -> Result<Vec<Vec<AdminBoundary>>, ApplicationError> {
        self.points_batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(points.iter().map(|p| self.containing(p)).collect())
    }

    async fn search_by_names(
        &self,
        terms: &[NameSearchTerm],
    ) -> Result<Vec<NameSearchHit>, ApplicationError> {
        self.names_batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(terms
            .iter()
            .filter_map(|term| {
                self.find(&term.name, term.level).map(|boundary| NameSearchHit {
                    index: term.index,
                    boundary,
                })
            })
            .collect())
    }
}

/// Spain → Catalonia → Barcelona (province) → Barcelona (city) → Eixample →
/// Dreta de l'Eixample
pub fn barcelona_boundaries() -> InMemoryBoundaryStore {
    let mut store = InMemoryBoundaryStore::default();
    store.insert_area(
        AdminBoundary::new(1, "España", AdminLevel::Country, None).with_translation("en", "Spain"),
        BARCELONA,
        500_000.0,
    );
    store.insert_area(
        AdminBoundary::new(10, "Catalunya", AdminLevel::Region, Some(1))
            .with_translation("en", "Catalonia")
            .with_translation("es", "Cataluña"),
        BARCELONA,
        100_000.0,
    );
    store.insert_area(
        AdminBoundary::new(100, "Barcelona", AdminLevel::Province, Some(10)),
        BARCELONA,
        40_000.0,
    );
    store.insert_area(
        AdminBoundary::new(1000, "Barcelona", AdminLevel::City, Some(100)),
        BARCELONA,
        8_000.0,
    );
    store.insert_area(
        AdminBoundary::new(10_000, "Eixample", AdminLevel::District, Some(1000)),
        GeoLocation::new_unchecked(41.3925, 2.1650),
        1_500.0,
    );
    store.insert_area(
        AdminBoundary::new(
            100_000,
            "la Dreta de l'Eixample",
            AdminLevel::Neighborhood,
            Some(10_000),
        ),
        GeoLocation::new_unchecked(41.3940, 2.1680),
        600.0,
    );
    store
}

/// Transport store over a fixed station list
#[derive(Debug, Default)]
pub struct InMemoryTransportStore {
    stations: Vec<StationCandidate>,
    lines: HashMap<i64, Vec<LineInfo>>,
    pub station_calls: AtomicUsize,
    pub station_batch_calls: AtomicUsize,
    pub line_calls: AtomicUsize,
    pub line_batch_calls: AtomicUsize,
}

impl InMemoryTransportStore {
    pub fn station(
        &mut self,
        id: i64,
        name: &str,
        transport_type: TransportType,
        lat: f64,
        lon: f64,
    ) {
        self.stations.push(StationCandidate {
            id,
            name: name.to_string(),
            transport_type,
            location: GeoLocation::new_unchecked(lat, lon),
        });
    }

    pub fn line(&mut self, station_id: i64, id: i64, line_ref: &str, line_type: &str) {
        self.lines.entry(station_id).or_default().push(LineInfo {
            id,
            name: format!("Line {line_ref}"),
            line_ref: line_ref.to_string(),
            line_type: line_type.to_string(),
            color: None,
        });
    }

    fn nearest(
        &self,
        location: &GeoLocation,
        radius_m: f64,
        limit: usize,
    ) -> Vec<StationCandidate> {
        let mut within: Vec<(f64, &StationCandidate)> = self
            .stations
            .iter()
            .map(|s| (location.distance_m(&s.location), s))
            .filter(|(d, _)| *d <= radius_m)
            .collect();
        within.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut high = 0;
        let mut low = 0;
        within
            .into_iter()
            .filter(|(_, s)| {
                let counter = match s.transport_type.priority() {
                    TransportPriority::High => &mut high,
                    TransportPriority::Low => &mut low,
                };
                *counter += 1;
                *counter <= limit
            })
            .map(|(_, s)| s.clone())
            .collect()
    }
}

#[async_trait]
impl TransportStore for InMemoryTransportStore {
    async fn nearest_by_priority(
        &self,
        location: GeoLocation,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<StationCandidate>, ApplicationError> {
        self.station_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nearest(&location, radius_m, limit))
    }

    async fn nearest_by_priority_batch(
        &self,
        points: &[GeoLocation],
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<Vec<StationCandidate>>, ApplicationError> {
        self.station_batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(points.iter().map(|p| self.nearest(p, radius_m, limit)).collect())
    }

    async fn lines_by_station_id(
        &self,
        station_id: i64,
    ) -> Result<Vec<LineInfo>, ApplicationError> {
        self.line_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lines.get(&station_id).cloned().unwrap_or_default())
    }

    async fn lines_by_station_ids(
        &self,
        station_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<LineInfo>>, ApplicationError> {
        self.line_batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(station_ids
            .iter()
            .filter_map(|id| self.lines.get(id).map(|lines| (*id, lines.clone())))
            .collect())
    }
}

/// Stations around Plaça de Catalunya, mixing every transport type
pub fn barcelona_transport() -> InMemoryTransportStore {
    let mut store = InMemoryTransportStore::default();
    store.station(1, "Catalunya", TransportType::Metro, 41.3870, 2.1700);
    store.station(2, "Catalunya", TransportType::Metro, 41.3872, 2.1702);
    store.station(3, "Plaça de Catalunya", TransportType::Train, 41.3866, 2.1710);
    store.station(4, "Urquinaona", TransportType::Metro, 41.3888, 2.1738);
    store.station(5, "Liceu", TransportType::Metro, 41.3816, 2.1733);
    store.station(6, "Jaume I", TransportType::Metro, 41.3840, 2.1778);
    store.station(7, "Passeig de Gràcia", TransportType::Metro, 41.3917, 2.1649);
    store.station(8, "Pl. Catalunya", TransportType::Bus, 41.3858, 2.1728);
    store.station(9, "Rambla - Carme", TransportType::Bus, 41.3830, 2.1718);
    store.station(10, "Sagrada Família", TransportType::Metro, 41.4036, 2.1744);

    store.line(1, 101, "L1", "subway");
    store.line(1, 102, "L1", "subway");
    store.line(1, 103, "L3", "subway");
    store.line(1, 104, "", "subway");
    store.line(3, 301, "R2N", "train");
    store.line(8, 801, "V15", "bus");
    store
}
