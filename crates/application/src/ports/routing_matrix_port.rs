//! Routing matrix port
//!
//! Pairwise walking distance/duration between origins and destinations,
//! served by an external routing API.

use async_trait::async_trait;
use domain::GeoLocation;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Result of a matrix call, indexed `[origin][destination]`
///
/// `None` marks a pair the router could not connect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingMatrix {
    /// Distances in meters
    pub distances: Vec<Vec<Option<f64>>>,
    /// Durations in seconds
    pub durations: Vec<Vec<Option<f64>>>,
}

impl RoutingMatrix {
    /// Distance for a pair; `None` if unroutable or out of range
    #[must_use]
    pub fn distance(&self, origin: usize, destination: usize) -> Option<f64> {
        self.distances
            .get(origin)
            .and_then(|row| row.get(destination))
            .copied()
            .flatten()
    }

    /// Duration for a pair; `None` if unroutable or out of range
    #[must_use]
    pub fn duration(&self, origin: usize, destination: usize) -> Option<f64> {
        self.durations
            .get(origin)
            .and_then(|row| row.get(destination))
            .copied()
            .flatten()
    }
}

/// Port for routing-matrix calls
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoutingMatrixPort: Send + Sync {
    /// Walking matrix from every origin to every destination
    async fn matrix(
        &self,
        origins: &[GeoLocation],
        destinations: &[GeoLocation],
    ) -> Result<RoutingMatrix, ApplicationError>;
}
