//! Persistence module
//!
//! PostGIS-backed stores for administrative boundaries and transit stations.
//!
//! Expected schema (WGS84 geometries):
//!
//! ```sql
//! admin_boundaries(id BIGINT, name TEXT, name_translations JSONB,
//!                  admin_level SMALLINT, parent_id BIGINT NULL,
//!                  geom geometry(MultiPolygon, 4326))
//! transport_stations(id BIGINT, name TEXT, transport_type TEXT,
//!                    geom geometry(Point, 4326))
//! transport_lines(id BIGINT, name TEXT, ref TEXT, line_type TEXT, color TEXT NULL)
//! station_lines(station_id BIGINT, line_id BIGINT)
//! ```
//!
//! Name search uses `similarity()` from `pg_trgm`.

mod boundary_store;
mod connection;
mod error;
mod transport_store;

pub use boundary_store::PostgisBoundaryStore;
pub use connection::{DatabaseError, create_pool};
pub use error::map_sqlx_error;
pub use transport_store::PostgisTransportStore;
