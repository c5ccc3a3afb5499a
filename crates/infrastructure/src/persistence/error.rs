//! Shared error mapping for sqlx persistence layer

use application::error::ApplicationError;

/// Map a sqlx error to an application-layer error
///
/// Store failures are never the caller's fault, so every variant maps to
/// `UpstreamUnavailable`.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::Database(db_err) => {
            ApplicationError::UpstreamUnavailable(format!("Database error: {db_err}"))
        },
        sqlx::Error::PoolTimedOut => {
            ApplicationError::UpstreamUnavailable("Database pool timed out".to_string())
        },
        other => ApplicationError::UpstreamUnavailable(format!("Database error: {other}")),
    }
}
