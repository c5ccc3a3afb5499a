//! Routing matrix adapter - Implements `RoutingMatrixPort` using integration_routing

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::{RoutingMatrix, RoutingMatrixPort};
use async_trait::async_trait;
use domain::GeoLocation;
use integration_routing::{Coordinate, MatrixClient, RoutingError};
use tracing::{debug, instrument};

use super::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

const CIRCUIT_NAME: &str = "routing-matrix";

/// Adapter for the external routing-matrix API
pub struct RoutingMatrixAdapter {
    client: Arc<dyn MatrixClient>,
    circuit_breaker: Option<CircuitBreaker>,
}

impl std::fmt::Debug for RoutingMatrixAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingMatrixAdapter")
            .field("max_coordinates", &self.client.max_coordinates())
            .field(
                "circuit_breaker",
                &self.circuit_breaker.as_ref().map(CircuitBreaker::name),
            )
            .finish()
    }
}

impl RoutingMatrixAdapter {
    /// Create a new adapter without circuit breaker
    #[must_use]
    pub fn new(client: Arc<dyn MatrixClient>) -> Self {
        Self {
            client,
            circuit_breaker: None,
        }
    }

    /// Enable circuit breaker with custom configuration
    #[must_use]
    pub fn with_circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(CircuitBreaker::with_config(CIRCUIT_NAME, config));
        self
    }

    fn to_coordinates(points: &[GeoLocation]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|p| Coordinate::new(p.latitude(), p.longitude()))
            .collect()
    }

    fn map_error(error: &RoutingError) -> ApplicationError {
        match error {
            RoutingError::InvalidInput(msg) => ApplicationError::InvalidInput(msg.clone()),
            other => {
                ApplicationError::UpstreamUnavailable(format!("Routing matrix failed: {other}"))
            },
        }
    }
}

#[async_trait]
impl RoutingMatrixPort for RoutingMatrixAdapter {
    #[instrument(skip_all, fields(origins = origins.len(), destinations = destinations.len()))]
    async fn matrix(
        &self,
        origins: &[GeoLocation],
        destinations: &[GeoLocation],
    ) -> Result<RoutingMatrix, ApplicationError> {
        let origins = Self::to_coordinates(origins);
        let destinations = Self::to_coordinates(destinations);

        let result = match &self.circuit_breaker {
            Some(cb) => cb
                .call(|| self.client.matrix(&origins, &destinations))
                .await
                .map_err(|e| match e {
                    CircuitBreakerError::CircuitOpen(open) => {
                        ApplicationError::UpstreamUnavailable(open.to_string())
                    },
                    CircuitBreakerError::ServiceError(e) => Self::map_error(&e),
                }),
            None => self
                .client
                .matrix(&origins, &destinations)
                .await
                .map_err(|e| Self::map_error(&e)),
        }?;

        debug!(rows = result.distances.len(), "Routing matrix mapped");
        Ok(RoutingMatrix {
            distances: result.distances,
            durations: result.durations,
        })
    }
}
