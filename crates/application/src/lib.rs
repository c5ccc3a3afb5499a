//! Application layer - Use cases and orchestration
//!
//! Defines the ports the enrichment pipeline consumes, the error taxonomy,
//! and the services that compose them: boundary resolution, priority
//! transport search, routing-matrix batching and the enrichment orchestrator.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;

#[cfg(test)]
mod test_support;
