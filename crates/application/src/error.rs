//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Malformed coordinates, non-positive radius or limit, invalid value objects
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No administrative level could be resolved
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// A store, the stream or the routing API failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A stream payload could not be parsed
    #[error("Poison message: {0}")]
    PoisonMessage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
