//! Circuit breaker pattern for external service calls
//!
//! Implements the circuit breaker pattern to prevent cascading failures
//! when external services are unavailable.
//!
//! # States
//!
//! - **Closed**: Normal operation, requests pass through
//! - **Open**: Service is down, requests fail fast without calling the service
//! - **Half-Open**: Testing if the service has recovered
//!
//! # Example
//!
//! ```rust,ignore
//! use infrastructure::adapters::CircuitBreaker;
//!
//! let cb = CircuitBreaker::new("routing-matrix");
//! let result = cb.call(|| async {
//!     client.matrix(&origins, &destinations).await
//! }).await;
//! ```

use std::{
    fmt,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for a circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Number of consecutive successes to close the circuit
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Time in seconds to wait before transitioning from Open to Half-Open
    #[serde(default = "default_half_open_timeout_secs")]
    pub half_open_timeout_secs: u64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_success_threshold() -> u32 {
    2
}

const fn default_half_open_timeout_secs() -> u64 {
    30
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            half_open_timeout_secs: default_half_open_timeout_secs(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a custom configuration
    #[must_use]
    pub const fn custom(
        failure_threshold: u32,
        success_threshold: u32,
        half_open_timeout_secs: u64,
    ) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            half_open_timeout_secs,
        }
    }
}

/// State of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests pass through
    Closed,
    /// Service is down, requests fail fast
    Open,
    /// Testing if the service has recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned when the circuit is open
#[derive(Debug, Clone)]
pub struct CircuitOpenError {
    /// Name of the service
    pub service_name: String,
}

impl std::error::Error for CircuitOpenError {}

impl fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Circuit breaker open for service '{}': service is temporarily unavailable",
            self.service_name
        )
    }
}

struct CircuitBreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreakerState {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
        }
    }
}

/// Circuit breaker wrapper for external service calls
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: RwLock<CircuitBreakerState>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Creates a new circuit breaker with default configuration
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Creates a new circuit breaker with custom configuration
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: RwLock::new(CircuitBreakerState::closed()),
        }
    }

    /// Returns the name of this circuit breaker
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state, moving Open to Half-Open once the timeout elapsed
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.write();

        if state.state == CircuitState::Open {
            if let Some(opened_at) = state.opened_at {
                let elapsed = opened_at.elapsed();
                if elapsed >= Duration::from_secs(self.config.half_open_timeout_secs) {
                    debug!(
                        service = %self.name,
                        elapsed_secs = elapsed.as_secs(),
                        "Circuit transitioning from Open to HalfOpen"
                    );
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                }
            }
        }

        state.state
    }

    /// Returns true if the circuit is closed (normal operation)
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Returns true if the circuit is open (service unavailable)
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    fn on_success(&self) {
        let mut state = self.state.write();
        state.failure_count = 0;

        if state.state == CircuitState::HalfOpen {
            state.success_count += 1;
            if state.success_count >= self.config.success_threshold {
                info!(
                    service = %self.name,
                    successes = state.success_count,
                    "Circuit transitioning from HalfOpen to Closed"
                );
                *state = CircuitBreakerState::closed();
            }
        }
    }

    fn on_failure(&self) {
        let mut state = self.state.write();
        state.failure_count += 1;
        state.success_count = 0;

        let trip = match state.state {
            CircuitState::Closed => state.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if trip {
            warn!(
                service = %self.name,
                from = %state.state,
                failures = state.failure_count,
                "Circuit transitioning to Open"
            );
            state.state = CircuitState::Open;
            state.opened_at = Some(Instant::now());
            state.failure_count = 0;
        }
    }

    /// Calls an async operation through the circuit breaker
    ///
    /// If the circuit is open, returns `CircuitOpenError` immediately.
    /// Otherwise, executes the operation and tracks its success/failure.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The circuit is open (`CircuitOpenError`)
    /// - The inner operation fails (the original error)
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: fmt::Debug,
    {
        let current_state = self.state();
        if current_state == CircuitState::Open {
            warn!(
                service = %self.name,
                state = %current_state,
                "Circuit breaker preventing call to service"
            );
            return Err(CircuitBreakerError::CircuitOpen(CircuitOpenError {
                service_name: self.name.clone(),
            }));
        }

        match f().await {
            Ok(result) => {
                self.on_success();
                Ok(result)
            },
            Err(e) => {
                warn!(service = %self.name, error = ?e, "Service call failed");
                self.on_failure();
                Err(CircuitBreakerError::ServiceError(e))
            },
        }
    }
}

/// Error type for circuit breaker operations
#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open, preventing the call
    CircuitOpen(CircuitOpenError),
    /// The underlying service returned an error
    ServiceError(E),
}

impl<E: fmt::Display> fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen(e) => write!(f, "{e}"),
            Self::ServiceError(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CircuitBreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CircuitOpen(e) => Some(e),
            Self::ServiceError(e) => Some(e),
        }
    }
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if this is a circuit open error
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }
}
