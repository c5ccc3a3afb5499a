//! Routing error types

use thiserror::Error;

/// Errors that can occur while querying the routing-matrix service
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Connection to the routing service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP request to the routing service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Failed to parse response from the routing service
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying (if provided by API)
        retry_after_secs: Option<u64>,
    },

    /// The service answered with a non-`Ok` code
    #[error("Routing failed with code {code}: {message}")]
    NoRoute {
        /// Response code reported by the service
        code: String,
        /// Human readable message, empty when absent
        message: String,
    },

    /// Invalid input (empty coordinate list, out-of-range coordinate)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request exceeds the per-call coordinate ceiling
    #[error("Too many coordinates: {count} exceeds maximum of {max}")]
    TooManyCoordinates {
        /// Coordinates in the request
        count: usize,
        /// Configured ceiling
        max: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },
}

impl RoutingError {
    /// Returns true if this error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::RequestFailed(_)
                | Self::Timeout { .. }
                | Self::RateLimitExceeded { .. }
        )
    }
}
