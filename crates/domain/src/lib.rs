//! Domain layer for the location enrichment pipeline
//!
//! Contains the enrichment request/result model, administrative boundaries,
//! transit stations, and the pure rules that operate on them (walking
//! estimates, station and line deduplication).
//! This layer has no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
