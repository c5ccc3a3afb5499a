//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: PostGIS boundary and
//! transport stores, the Redis stream adapter and the routing-matrix adapter.
//! Also owns configuration loading and logging setup.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod telemetry;

pub use adapters::*;
pub use config::{
    AppConfig, DatabaseConfig, LogFormat, ResilienceConfig, StreamConfig, TelemetryAppConfig,
};
pub use persistence::{DatabaseError, PostgisBoundaryStore, PostgisTransportStore, create_pool};
pub use telemetry::{TelemetryError, init_telemetry};
