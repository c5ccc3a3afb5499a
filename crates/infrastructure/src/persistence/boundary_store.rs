//! PostGIS boundary store

use std::collections::BTreeMap;

use application::error::ApplicationError;
use application::ports::{BoundaryStore, NameSearchHit, NameSearchTerm};
use async_trait::async_trait;
use domain::{AdminBoundary, AdminLevel, GeoLocation};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, instrument};

use super::error::map_sqlx_error;

const SEARCH_BY_NAME: &str = r"
    SELECT id, name, name_translations, admin_level, parent_id
    FROM admin_boundaries
    WHERE admin_level = $2
      AND (name ILIKE $1
           OR name % $1
           OR EXISTS (SELECT 1 FROM jsonb_each_text(name_translations) t WHERE t.value ILIKE $1))
    ORDER BY GREATEST(
                 similarity(name, $1),
                 COALESCE((SELECT max(similarity(t.value, $1))
                           FROM jsonb_each_text(name_translations) t), 0)
             ) DESC,
             id
    LIMIT $3
";

const GET_BY_ID: &str = r"
    SELECT id, name, name_translations, admin_level, parent_id
    FROM admin_boundaries
    WHERE id = $1
";

const GET_BY_POINT: &str = r"
    SELECT id, name, name_translations, admin_level, parent_id
    FROM admin_boundaries
    WHERE ST_Contains(geom, ST_SetSRID(ST_MakePoint($1, $2), 4326))
    ORDER BY admin_level, id
";

const GET_BY_POINTS: &str = r"
    SELECT p.idx, b.id, b.name, b.name_translations, b.admin_level, b.parent_id
    FROM unnest($1::float8[], $2::float8[]) WITH ORDINALITY AS p(lon, lat, idx)
    JOIN admin_boundaries b
      ON ST_Contains(b.geom, ST_SetSRID(ST_MakePoint(p.lon, p.lat), 4326))
    ORDER BY p.idx, b.admin_level, b.id
";

const SEARCH_BY_NAMES: &str = r"
    SELECT DISTINCT ON (t.ord) t.idx, b.id, b.name, b.name_translations, b.admin_level, b.parent_id
    FROM unnest($1::int8[], $2::int2[], $3::text[]) WITH ORDINALITY AS t(idx, level, name, ord)
    JOIN admin_boundaries b
      ON b.admin_level = t.level
     AND (b.name ILIKE t.name
          OR b.name % t.name
          OR EXISTS (SELECT 1 FROM jsonb_each_text(b.name_translations) tr
                     WHERE tr.value ILIKE t.name))
    ORDER BY t.ord, similarity(b.name, t.name) DESC, b.id
";

/// Boundary store over the `admin_boundaries` table
#[derive(Debug, Clone)]
pub struct PostgisBoundaryStore {
    pool: PgPool,
}

impl PostgisBoundaryStore {
    /// Create a new store
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoundaryStore for PostgisBoundaryStore {
    #[instrument(skip(self))]
    async fn search_by_name(
        &self,
        name: &str,
        level: AdminLevel,
        limit: usize,
    ) -> Result<Vec<AdminBoundary>, ApplicationError> {
        let rows: Vec<BoundaryRow> = sqlx::query_as(SEARCH_BY_NAME)
            .bind(name)
            .bind(level.code())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(count = rows.len(), "Boundaries found by name");
        Ok(rows.into_iter().map(AdminBoundary::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i64) -> Result<Option<AdminBoundary>, ApplicationError> {
        let row: Option<BoundaryRow> = sqlx::query_as(GET_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(AdminBoundary::from))
    }

    #[instrument(skip(self), fields(lat = location.latitude(), lon = location.longitude()))]
    async fn get_by_point(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<AdminBoundary>, ApplicationError> {
        let rows: Vec<BoundaryRow> = sqlx::query_as(GET_BY_POINT)
            .bind(location.longitude())
            .bind(location.latitude())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(count = rows.len(), "Boundaries containing point");
        Ok(rows.into_iter().map(AdminBoundary::from).collect())
    }

    #[instrument(skip_all, fields(points = points.len()))]
    async fn get_by_points(
        &self,
        points: &[GeoLocation],
    ) -> Result<Vec<Vec<AdminBoundary>>, ApplicationError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let (lons, lats): (Vec<f64>, Vec<f64>) =
            points.iter().map(|p| (p.longitude(), p.latitude())).unzip();

        let rows: Vec<IndexedBoundaryRow> = sqlx::query_as(GET_BY_POINTS)
            .bind(lons)
            .bind(lats)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(group_by_ordinal(rows, points.len()))
    }

    #[instrument(skip_all, fields(terms = terms.len()))]
    async fn search_by_names(
        &self,
        terms: &[NameSearchTerm],
    ) -> Result<Vec<NameSearchHit>, ApplicationError> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let indices: Vec<i64> = terms
            .iter()
            .map(|t| i64::try_from(t.index).unwrap_or(i64::MAX))
            .collect();
        let levels: Vec<i16> = terms.iter().map(|t| t.level.code()).collect();
        let names: Vec<String> = terms.iter().map(|t| t.name.clone()).collect();

        let rows: Vec<IndexedBoundaryRow> = sqlx::query_as(SEARCH_BY_NAMES)
            .bind(indices)
            .bind(levels)
            .bind(names)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(hits = rows.len(), "Batch name search finished");
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                usize::try_from(row.idx).ok().map(|index| NameSearchHit {
                    index,
                    boundary: row.boundary.into(),
                })
            })
            .collect())
    }
}

/// Row type for boundary queries
#[derive(Debug, sqlx::FromRow)]
struct BoundaryRow {
    id: i64,
    name: String,
    name_translations: Option<Json<BTreeMap<String, String>>>,
    admin_level: i16,
    parent_id: Option<i64>,
}

/// Boundary row tagged with an index column
#[derive(Debug, sqlx::FromRow)]
struct IndexedBoundaryRow {
    idx: i64,
    #[sqlx(flatten)]
    boundary: BoundaryRow,
}

impl From<BoundaryRow> for AdminBoundary {
    fn from(row: BoundaryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            translations: row.name_translations.map(|t| t.0).unwrap_or_default(),
            admin_level: row.admin_level,
            parent_id: row.parent_id,
        }
    }
}

/// Group rows by their 1-based ordinality into `len` buckets
fn group_by_ordinal(rows: Vec<IndexedBoundaryRow>, len: usize) -> Vec<Vec<AdminBoundary>> {
    let mut grouped = vec![Vec::new(); len];
    for row in rows {
        let slot = usize::try_from(row.idx - 1).ok().and_then(|i| grouped.get_mut(i));
        if let Some(bucket) = slot {
            bucket.push(row.boundary.into());
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: i64, id: i64) -> IndexedBoundaryRow {
        IndexedBoundaryRow {
            idx,
            boundary: BoundaryRow {
                id,
                name: format!("b{id}"),
                name_translations: Some(Json(BTreeMap::from([(
                    "en".to_string(),
                    format!("B{id}"),
                )]))),
                admin_level: 8,
                parent_id: None,
            },
        }
    }

    #[test]
    fn rows_group_by_point_ordinal() {
        let grouped = group_by_ordinal(vec![row(1, 10), row(1, 11), row(3, 30)], 3);
        assert_eq!(grouped.len(), 3);
        assert_eq!(
            grouped[0].iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![10, 11]
        );
        assert!(grouped[1].is_empty());
        assert_eq!(grouped[2][0].id, 30);
    }

    #[test]
    fn out_of_range_ordinals_are_dropped() {
        let grouped = group_by_ordinal(vec![row(0, 1), row(5, 2)], 2);
        assert!(grouped.iter().all(Vec::is_empty));
    }

    #[test]
    fn row_maps_translations() {
        let boundary: AdminBoundary = row(1, 7).boundary.into();
        assert_eq!(boundary.translations.get("en").map(String::as_str), Some("B7"));
        assert_eq!(boundary.level(), Some(AdminLevel::City));
    }

    #[test]
    fn missing_translations_become_empty() {
        let mut r = row(1, 7);
        r.boundary.name_translations = None;
        let boundary: AdminBoundary = r.boundary.into();
        assert!(boundary.translations.is_empty());
    }
}
