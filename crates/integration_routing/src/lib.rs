//! Routing-matrix integration
//!
//! Provides pairwise walking distances and durations via the
//! [Mapbox Matrix API](https://docs.mapbox.com/api/navigation/matrix/) or any
//! server exposing the same `directions-matrix/v1` endpoint.
//!
//! # Architecture
//!
//! [`MatrixClient`] defines the interface, implemented by
//! [`MatrixRoutingClient`] over `reqwest`. The infrastructure layer adapts it
//! to the application's routing port.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_routing::{Coordinate, MatrixClient, MatrixRoutingClient, RoutingConfig};
//!
//! let client = MatrixRoutingClient::new(&RoutingConfig::default())?;
//!
//! let matrix = client.matrix(
//!     &[Coordinate::new(41.3851, 2.1734)],             // origin
//!     &[Coordinate::new(41.3870, 2.1700)],             // destination
//! ).await?;
//! ```

mod client;
mod config;
mod error;
mod models;

pub use client::{MatrixClient, MatrixRoutingClient};
pub use config::RoutingConfig;
pub use error::RoutingError;
pub use models::{Coordinate, MatrixResponse, TravelMatrix};
