//! PostGIS transport store

use std::collections::HashMap;

use application::error::ApplicationError;
use application::ports::TransportStore;
use async_trait::async_trait;
use domain::{GeoLocation, LineInfo, StationCandidate, TransportPriority, TransportType};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use super::error::map_sqlx_error;

// Up to $4 stations per priority class within $3 meters of ($1, $2)
const NEAREST_BY_PRIORITY: &str = r"
    SELECT id, name, transport_type, lat, lon
    FROM (
        SELECT s.id, s.name, s.transport_type,
               ST_Y(s.geom) AS lat, ST_X(s.geom) AS lon,
               ROW_NUMBER() OVER (
                   PARTITION BY s.transport_type = ANY($5)
                   ORDER BY ST_Distance(s.geom::geography, o.g), s.id
               ) AS rn,
               ST_Distance(s.geom::geography, o.g) AS dist
        FROM transport_stations s,
             (SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS g) o
        WHERE ST_DWithin(s.geom::geography, o.g, $3)
    ) ranked
    WHERE rn <= $4
    ORDER BY dist, id
";

const NEAREST_BY_PRIORITY_BATCH: &str = r"
    SELECT p.idx, n.id, n.name, n.transport_type, n.lat, n.lon
    FROM unnest($1::float8[], $2::float8[]) WITH ORDINALITY AS p(lon, lat, idx)
    CROSS JOIN LATERAL (
        SELECT id, name, transport_type, lat, lon, dist
        FROM (
            SELECT s.id, s.name, s.transport_type,
                   ST_Y(s.geom) AS lat, ST_X(s.geom) AS lon,
                   ROW_NUMBER() OVER (
                       PARTITION BY s.transport_type = ANY($5)
                       ORDER BY ST_Distance(s.geom::geography, o.g), s.id
                   ) AS rn,
                   ST_Distance(s.geom::geography, o.g) AS dist
            FROM transport_stations s,
                 (SELECT ST_SetSRID(ST_MakePoint(p.lon, p.lat), 4326)::geography AS g) o
            WHERE ST_DWithin(s.geom::geography, o.g, $3)
        ) ranked
        WHERE rn <= $4
    ) n
    ORDER BY p.idx, n.dist, n.id
";

const LINES_BY_STATION: &str = r"
    SELECT sl.station_id, l.id, l.name, l.ref, l.line_type, l.color
    FROM station_lines sl
    JOIN transport_lines l ON l.id = sl.line_id
    WHERE sl.station_id = $1
    ORDER BY l.ref, l.id
";

const LINES_BY_STATIONS: &str = r"
    SELECT sl.station_id, l.id, l.name, l.ref, l.line_type, l.color
    FROM station_lines sl
    JOIN transport_lines l ON l.id = sl.line_id
    WHERE sl.station_id = ANY($1)
    ORDER BY sl.station_id, l.ref, l.id
";

/// Transport store over the `transport_stations` and `transport_lines` tables
#[derive(Debug, Clone)]
pub struct PostgisTransportStore {
    pool: PgPool,
}

impl PostgisTransportStore {
    /// Create a new store
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Stored labels of the high-priority station types
fn high_priority_labels() -> Vec<&'static str> {
    TransportType::ALL
        .into_iter()
        .filter(|t| t.priority() == TransportPriority::High)
        .map(TransportType::as_str)
        .collect()
}

fn bind_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl TransportStore for PostgisTransportStore {
    #[instrument(skip(self), fields(lat = location.latitude(), lon = location.longitude()))]
    async fn nearest_by_priority(
        &self,
        location: GeoLocation,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<StationCandidate>, ApplicationError> {
        let rows: Vec<StationRow> = sqlx::query_as(NEAREST_BY_PRIORITY)
            .bind(location.longitude())
            .bind(location.latitude())
            .bind(radius_m)
            .bind(bind_limit(limit))
            .bind(high_priority_labels())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(count = rows.len(), "Stations within radius");
        Ok(rows.into_iter().filter_map(StationRow::into_candidate).collect())
    }

    #[instrument(skip(self, points), fields(points = points.len()))]
    async fn nearest_by_priority_batch(
        &self,
        points: &[GeoLocation],
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<Vec<StationCandidate>>, ApplicationError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let (lons, lats): (Vec<f64>, Vec<f64>) =
            points.iter().map(|p| (p.longitude(), p.latitude())).unzip();

        let rows: Vec<IndexedStationRow> = sqlx::query_as(NEAREST_BY_PRIORITY_BATCH)
            .bind(lons)
            .bind(lats)
            .bind(radius_m)
            .bind(bind_limit(limit))
            .bind(high_priority_labels())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut grouped = vec![Vec::new(); points.len()];
        for row in rows {
            let slot = usize::try_from(row.idx - 1)
                .ok()
                .and_then(|i| grouped.get_mut(i));
            if let (Some(bucket), Some(candidate)) = (slot, row.station.into_candidate()) {
                bucket.push(candidate);
            }
        }
        Ok(grouped)
    }

    #[instrument(skip(self))]
    async fn lines_by_station_id(
        &self,
        station_id: i64,
    ) -> Result<Vec<LineInfo>, ApplicationError> {
        let rows: Vec<LineRow> = sqlx::query_as(LINES_BY_STATION)
            .bind(station_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LineInfo::from).collect())
    }

    #[instrument(skip_all, fields(stations = station_ids.len()))]
    async fn lines_by_station_ids(
        &self,
        station_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<LineInfo>>, ApplicationError> {
        if station_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<LineRow> = sqlx::query_as(LINES_BY_STATIONS)
            .bind(station_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(group_lines(rows))
    }
}

/// Row type for station queries
#[derive(Debug, Clone, sqlx::FromRow)]
struct StationRow {
    id: i64,
    name: String,
    transport_type: String,
    lat: f64,
    lon: f64,
}

impl StationRow {
    /// Convert to a candidate; rows with an unknown type or invalid point are skipped
    fn into_candidate(self) -> Option<StationCandidate> {
        let transport_type = match self.transport_type.parse::<TransportType>() {
            Ok(t) => t,
            Err(e) => {
                warn!(station_id = self.id, error = %e, "Skipping station");
                return None;
            },
        };
        let location = match GeoLocation::new(self.lat, self.lon) {
            Ok(l) => l,
            Err(e) => {
                warn!(station_id = self.id, error = %e, "Skipping station");
                return None;
            },
        };
        Some(StationCandidate {
            id: self.id,
            name: self.name,
            transport_type,
            location,
        })
    }
}

/// Station row tagged with the 1-based point ordinal
#[derive(Debug, sqlx::FromRow)]
struct IndexedStationRow {
    idx: i64,
    #[sqlx(flatten)]
    station: StationRow,
}

/// Row type for line queries
#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    station_id: i64,
    id: i64,
    name: String,
    #[sqlx(rename = "ref")]
    line_ref: String,
    line_type: String,
    color: Option<String>,
}

impl From<LineRow> for LineInfo {
    fn from(row: LineRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            line_ref: row.line_ref,
            line_type: row.line_type,
            color: row.color,
        }
    }
}

fn group_lines(rows: Vec<LineRow>) -> HashMap<i64, Vec<LineInfo>> {
    let mut by_station: HashMap<i64, Vec<LineInfo>> = HashMap::new();
    for row in rows {
        by_station.entry(row.station_id).or_default().push(row.into());
    }
    by_station
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(transport_type: &str, lat: f64) -> StationRow {
        StationRow {
            id: 1,
            name: "Catalunya".to_string(),
            transport_type: transport_type.to_string(),
            lat,
            lon: 2.17,
        }
    }

    fn line(station_id: i64, id: i64, line_ref: &str) -> LineRow {
        LineRow {
            station_id,
            id,
            name: format!("Line {line_ref}"),
            line_ref: line_ref.to_string(),
            line_type: "subway".to_string(),
            color: None,
        }
    }

    #[test]
    fn high_priority_labels_are_metro_and_train() {
        assert_eq!(high_priority_labels(), vec!["metro", "train"]);
    }

    #[test]
    fn station_rows_convert() {
        let candidate = station("subway", 41.387).into_candidate().unwrap();
        assert_eq!(candidate.transport_type, TransportType::Metro);
        assert!((candidate.location.latitude() - 41.387).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_type_or_bad_point_is_skipped() {
        assert!(station("ferry", 41.387).into_candidate().is_none());
        assert!(station("bus", 95.0).into_candidate().is_none());
    }

    #[test]
    fn lines_group_by_station() {
        let grouped = group_lines(vec![
            line(1, 10, "L1"),
            line(1, 11, "L3"),
            line(2, 20, "V15"),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&1].len(), 2);
        assert_eq!(grouped[&2][0].line_ref, "V15");
    }

    #[test]
    fn limit_binding_saturates() {
        assert_eq!(bind_limit(5), 5);
        assert_eq!(bind_limit(usize::MAX), i64::MAX);
    }
}
