//! Matrix API client
//!
//! Issues `directions-matrix/v1` requests against Mapbox or a compatible
//! server. Origins and destinations share one coordinate list; the `sources`
//! and `destinations` parameters select the rows and columns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::config::RoutingConfig;
use crate::error::RoutingError;
use crate::models::{Coordinate, MatrixResponse, TravelMatrix};

/// Trait for routing-matrix clients
#[async_trait]
pub trait MatrixClient: Send + Sync {
    /// Pairwise walking distances and durations from every origin to every destination
    async fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<TravelMatrix, RoutingError>;

    /// Maximum coordinates accepted in one call
    fn max_coordinates(&self) -> usize;
}

/// Matrix client over the `directions-matrix/v1` HTTP API
#[derive(Debug)]
pub struct MatrixRoutingClient {
    client: Client,
    config: RoutingConfig,
}

impl MatrixRoutingClient {
    /// Create a new matrix client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &RoutingConfig) -> Result<Self, RoutingError> {
        config.validate().map_err(RoutingError::ConfigurationError)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("location-enricher/1.0")
            .build()
            .map_err(|e| RoutingError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Request URL for the given coordinate list
    fn url(&self, coordinates: &[Coordinate]) -> String {
        let path = coordinates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/directions-matrix/v1/{}/{path}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        )
    }

    /// Query parameters selecting `origins` rows and `destinations` columns
    fn params(&self, origins: usize, destinations: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sources", index_list(0..origins)),
            ("destinations", index_list(origins..origins + destinations)),
            ("annotations", "distance,duration".to_string()),
        ];
        if let Some(token) = &self.config.access_token {
            params.push(("access_token", token.clone()));
        }
        params
    }

    fn check_input(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<(), RoutingError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(RoutingError::InvalidInput(
                "origins and destinations must not be empty".to_string(),
            ));
        }
        if let Some(bad) = origins.iter().chain(destinations).find(|c| !c.is_valid()) {
            return Err(RoutingError::InvalidInput(format!(
                "coordinate out of range: {bad}"
            )));
        }
        let count = origins.len() + destinations.len();
        if count > self.config.max_coordinates {
            return Err(RoutingError::TooManyCoordinates {
                count,
                max: self.config.max_coordinates,
            });
        }
        Ok(())
    }

    /// Parse a response body into a typed matrix
    fn parse_matrix_response(
        body: &str,
        origins: usize,
        destinations: usize,
    ) -> Result<TravelMatrix, RoutingError> {
        let response: MatrixResponse =
            serde_json::from_str(body).map_err(|e| RoutingError::ParseError(e.to_string()))?;

        if !response.is_ok() {
            return Err(no_route(response));
        }

        Ok(TravelMatrix::from_response(response, origins, destinations))
    }
}

#[async_trait]
impl MatrixClient for MatrixRoutingClient {
    #[instrument(
        skip(self, origins, destinations),
        fields(origins = origins.len(), destinations = destinations.len())
    )]
    async fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<TravelMatrix, RoutingError> {
        self.check_input(origins, destinations)?;

        let coordinates: Vec<Coordinate> = origins.iter().chain(destinations).copied().collect();
        let url = self.url(&coordinates);
        let params = self.params(origins.len(), destinations.len());

        debug!(?url, "Requesting routing matrix");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutingError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    RoutingError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::RateLimitExceeded {
                retry_after_secs: response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RoutingError::ParseError(e.to_string()))?;

        if !status.is_success() {
            // 4xx bodies carry a code and message
            let rejected = status
                .is_client_error()
                .then(|| serde_json::from_str::<MatrixResponse>(&body).ok())
                .flatten()
                .filter(|parsed| !parsed.is_ok());
            return Err(match rejected {
                Some(parsed) => {
                    warn!(%status, code = %parsed.code, "Routing request rejected");
                    no_route(parsed)
                },
                None => RoutingError::RequestFailed(format!("HTTP {status}")),
            });
        }

        let matrix = Self::parse_matrix_response(&body, origins.len(), destinations.len())?;
        debug!(rows = matrix.distances.len(), "Routing matrix received");
        Ok(matrix)
    }

    fn max_coordinates(&self) -> usize {
        self.config.max_coordinates
    }
}

fn no_route(response: MatrixResponse) -> RoutingError {
    RoutingError::NoRoute {
        code: response.code,
        message: response.message.unwrap_or_default(),
    }
}

/// `0;1;2` style index list
fn index_list(range: std::ops::Range<usize>) -> String {
    range
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MatrixRoutingClient {
        MatrixRoutingClient::new(&RoutingConfig::for_testing()).unwrap()
    }

    #[test]
    fn test_url_joins_lon_lat_pairs() {
        let url = client().url(&[Coordinate::new(41.0, 2.0), Coordinate::new(41.5, 2.5)]);
        assert_eq!(
            url,
            "https://api.mapbox.com/directions-matrix/v1/mapbox/walking/2,41;2.5,41.5"
        );
    }

    #[test]
    fn test_params_select_rows_and_columns() {
        let params = client().params(2, 3);
        assert!(params.contains(&("sources", "0;1".to_string())));
        assert!(params.contains(&("destinations", "2;3;4".to_string())));
        assert!(params.contains(&("annotations", "distance,duration".to_string())));
        assert!(params.contains(&("access_token", "test-token".to_string())));
    }

    #[test]
    fn test_params_without_token() {
        let config = RoutingConfig::default();
        let client = MatrixRoutingClient::new(&config).unwrap();
        assert!(client.params(1, 1).iter().all(|(k, _)| *k != "access_token"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RoutingConfig {
            timeout_secs: 0,
            ..RoutingConfig::default()
        };
        assert!(matches!(
            MatrixRoutingClient::new(&config),
            Err(RoutingError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_parse_non_ok_code() {
        let result = MatrixRoutingClient::parse_matrix_response(
            r#"{"code": "NoRoute", "message": "Impossible route"}"#,
            1,
            1,
        );
        assert!(matches!(result, Err(RoutingError::NoRoute { .. })));
    }

    #[tokio::test]
    async fn test_rejects_empty_destinations() {
        let result = client().matrix(&[Coordinate::new(41.0, 2.0)], &[]).await;
        assert!(matches!(result, Err(RoutingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_rejects_too_many_coordinates() {
        let destinations = vec![Coordinate::new(41.0, 2.0); 25];
        let result = client()
            .matrix(&[Coordinate::new(41.0, 2.0)], &destinations)
            .await;
        assert!(matches!(
            result,
            Err(RoutingError::TooManyCoordinates { count: 26, max: 25 })
        ));
    }
}
