//! PostGIS connection pool

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use crate::config::DatabaseConfig;

/// Error type for pool creation
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Create a lazily connecting pool
///
/// Connections are opened on first use, so startup does not fail while the
/// database is still coming up.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the URL cannot be parsed.
#[instrument(skip_all, fields(max_connections = config.max_connections))]
pub fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    config.validate().map_err(DatabaseError::Config)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy(&config.url)?;

    info!("PostGIS pool created");
    Ok(pool)
}
