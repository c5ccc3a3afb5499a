//! Administrative boundary store port
//!
//! Name search and point-in-polygon lookups over the boundary dataset.
//! The spatial queries themselves live in the infrastructure adapter.

use async_trait::async_trait;
use domain::{AdminBoundary, AdminLevel, GeoLocation};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// One name lookup inside a batch text search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSearchTerm {
    /// Index of the request the term belongs to
    pub index: usize,
    /// Level the name is searched at
    pub level: AdminLevel,
    /// Free-text name
    pub name: String,
}

impl NameSearchTerm {
    /// Create a term
    pub fn new(index: usize, level: AdminLevel, name: impl Into<String>) -> Self {
        Self {
            index,
            level,
            name: name.into(),
        }
    }
}

/// Best match for a [`NameSearchTerm`], tagged with the term's request index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSearchHit {
    pub index: usize,
    pub boundary: AdminBoundary,
}

/// Port for boundary lookups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    /// Search boundaries by name at exactly `level`, best match first
    async fn search_by_name(
        &self,
        name: &str,
        level: AdminLevel,
        limit: usize,
    ) -> Result<Vec<AdminBoundary>, ApplicationError>;

    /// Fetch one boundary by id
    async fn get_by_id(&self, id: i64) -> Result<Option<AdminBoundary>, ApplicationError>;

    /// All boundaries containing the point, at any level
    async fn get_by_point(
        &self,
        location: GeoLocation,
    ) -> Result<Vec<AdminBoundary>, ApplicationError>;

    /// Containing boundaries for many points in one round trip
    ///
    /// The returned vector is index-aligned with `points`.
    async fn get_by_points(
        &self,
        points: &[GeoLocation],
    ) -> Result<Vec<Vec<AdminBoundary>>, ApplicationError>;

    /// Best match for each term in one round trip
    ///
    /// Terms without a match produce no hit.
    async fn search_by_names(
        &self,
        terms: &[NameSearchTerm],
    ) -> Result<Vec<NameSearchHit>, ApplicationError>;
}
