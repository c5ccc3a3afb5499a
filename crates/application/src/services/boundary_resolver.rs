//! Administrative hierarchy resolution
//!
//! Resolves country → neighborhood from the most specific name supplied,
//! walking parent links upward, and falls back to point-in-polygon lookups
//! when the name path yields nothing useful.

use std::collections::HashSet;
use std::sync::Arc;

use domain::{
    AdminBoundary, AdminLevel, BoundaryInfo, EnrichRequest, EnrichedLocation, GeoLocation,
};
use tracing::{debug, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{BoundaryStore, NameSearchTerm};

/// Maximum number of parent lookups per hierarchy walk
pub const MAX_PARENT_HOPS: usize = 10;

/// Resolves administrative hierarchies against a [`BoundaryStore`]
pub struct BoundaryResolver {
    store: Arc<dyn BoundaryStore>,
}

impl std::fmt::Debug for BoundaryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryResolver").finish_non_exhaustive()
    }
}

impl BoundaryResolver {
    /// Create a resolver over a boundary store
    #[must_use]
    pub fn new(store: Arc<dyn BoundaryStore>) -> Self {
        Self { store }
    }

    /// Resolve the hierarchy for one request
    ///
    /// # Errors
    ///
    /// `InvalidInput` for malformed coordinates, `LocationNotFound` when no
    /// level could be populated, `UpstreamUnavailable` when the store fails.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn resolve(
        &self,
        request: &EnrichRequest,
    ) -> Result<EnrichedLocation, ApplicationError> {
        let location = request.location()?;
        let mut enriched = EnrichedLocation::default();

        if let Some((level, name)) = request.most_specific_name() {
            if let Some(seed) = self.best_match(name, level).await? {
                self.walk_up(seed, &mut enriched).await?;
            }
            if !enriched.has_useful_level() {
                debug!(
                    populated = enriched.populated_count(),
                    "Name path incomplete, applying fallback"
                );
                self.apply_fallback(request, location, &mut enriched).await?;
            }
        } else if let Some(location) = location {
            enriched = self.resolve_point(location).await?;
            if enriched.country.is_none() {
                self.fill_country_by_name(request, &mut enriched).await?;
            }
        } else {
            self.fill_country_by_name(request, &mut enriched).await?;
        }

        if enriched.is_empty() {
            return Err(not_found(request));
        }
        debug!(levels = enriched.populated_count(), "Hierarchy resolved");
        Ok(enriched)
    }

    /// Resolve many requests with at most two store round trips
    ///
    /// Visible requests with coordinates go through one point batch; every
    /// other request contributes its per-level names to one text batch. No
    /// parent walk or fallback runs here. The output is index-aligned with
    /// `requests`.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn resolve_batch(
        &self,
        requests: &[EnrichRequest],
    ) -> Vec<Result<EnrichedLocation, ApplicationError>> {
        let mut slots: Vec<Option<Result<EnrichedLocation, ApplicationError>>> =
            requests.iter().map(|_| None).collect();
        let mut point_indices = Vec::new();
        let mut points = Vec::new();
        let mut terms = Vec::new();

        for (index, request) in requests.iter().enumerate() {
            match request.location() {
                Err(e) => slots[index] = Some(Err(e.into())),
                Ok(Some(location)) if request.visible => {
                    point_indices.push(index);
                    points.push(location);
                },
                Ok(_) => terms.extend(
                    request
                        .name_terms()
                        .into_iter()
                        .map(|(level, name)| NameSearchTerm::new(index, level, name)),
                ),
            }
        }

        let point_lookup = async {
            if points.is_empty() {
                Ok(Vec::new())
            } else {
                self.store.get_by_points(&points).await
            }
        };
        let name_lookup = async {
            if terms.is_empty() {
                Ok(Vec::new())
            } else {
                self.store.search_by_names(&terms).await
            }
        };
        let (point_result, name_result) = tokio::join!(point_lookup, name_lookup);

        let mut resolved: Vec<EnrichedLocation> =
            requests.iter().map(|_| EnrichedLocation::default()).collect();

        match point_result {
            Ok(rows) => {
                for (index, boundaries) in point_indices.iter().zip(rows) {
                    for boundary in &boundaries {
                        resolved[*index].fill_from(boundary);
                    }
                }
            },
            Err(e) => {
                warn!(error = %e, points = point_indices.len(), "Batch point lookup failed");
                let message = e.to_string();
                for index in &point_indices {
                    slots[*index] = Some(Err(ApplicationError::UpstreamUnavailable(
                        message.clone(),
                    )));
                }
            },
        }

        match name_result {
            Ok(hits) => {
                for hit in hits {
                    if let Some(location) = resolved.get_mut(hit.index) {
                        location.fill_from(&hit.boundary);
                    }
                }
            },
            Err(e) => {
                warn!(error = %e, terms = terms.len(), "Batch name search failed");
                let message = e.to_string();
                for term in &terms {
                    slots[term.index] = Some(Err(ApplicationError::UpstreamUnavailable(
                        message.clone(),
                    )));
                }
            },
        }

        slots
            .into_iter()
            .zip(resolved)
            .zip(requests)
            .map(|((slot, location), request)| {
                slot.unwrap_or_else(|| {
                    if location.is_empty() {
                        Err(not_found(request))
                    } else {
                        Ok(location)
                    }
                })
            })
            .collect()
    }

    async fn best_match(
        &self,
        name: &str,
        level: AdminLevel,
    ) -> Result<Option<AdminBoundary>, ApplicationError> {
        let mut matches = self.store.search_by_name(name, level, 1).await?;
        if matches.is_empty() {
            debug!(name, level = %level, "No boundary matched");
            return Ok(None);
        }
        Ok(Some(matches.swap_remove(0)))
    }

    /// Follow parent links from `seed`, filling each level once
    async fn walk_up(
        &self,
        seed: AdminBoundary,
        enriched: &mut EnrichedLocation,
    ) -> Result<(), ApplicationError> {
        let mut visited = HashSet::new();
        let mut hops = 0;
        let mut current = Some(seed);

        while let Some(boundary) = current.take() {
            if !visited.insert(boundary.id) {
                warn!(boundary_id = boundary.id, "Cycle in boundary hierarchy");
                break;
            }
            enriched.fill_from(&boundary);

            let Some(parent_id) = boundary.parent_id else {
                break;
            };
            if hops == MAX_PARENT_HOPS {
                warn!(boundary_id = boundary.id, "Hop limit reached walking hierarchy");
                break;
            }
            hops += 1;
            current = self.store.get_by_id(parent_id).await?;
        }
        Ok(())
    }

    async fn resolve_point(
        &self,
        location: GeoLocation,
    ) -> Result<EnrichedLocation, ApplicationError> {
        let boundaries = self.store.get_by_point(location).await?;
        let mut enriched = EnrichedLocation::default();
        for boundary in &boundaries {
            enriched.fill_from(boundary);
        }
        Ok(enriched)
    }

    async fn apply_fallback(
        &self,
        request: &EnrichRequest,
        location: Option<GeoLocation>,
        enriched: &mut EnrichedLocation,
    ) -> Result<(), ApplicationError> {
        if let Some(location) = location {
            let by_point = self.resolve_point(location).await?;
            enriched.merge_missing(by_point);
        }
        if enriched.country.is_none() {
            self.fill_country_by_name(request, enriched).await?;
        }
        Ok(())
    }

    async fn fill_country_by_name(
        &self,
        request: &EnrichRequest,
        enriched: &mut EnrichedLocation,
    ) -> Result<(), ApplicationError> {
        let Some(country) = request.name_at(AdminLevel::Country) else {
            return Ok(());
        };
        if let Some(boundary) = self.best_match(country, AdminLevel::Country).await? {
            enriched.fill(AdminLevel::Country, BoundaryInfo::from(&boundary));
        }
        Ok(())
    }
}

fn not_found(request: &EnrichRequest) -> ApplicationError {
    let name = request
        .most_specific_name()
        .map_or(request.country.as_str(), |(_, name)| name);
    ApplicationError::LocationNotFound(format!(
        "no boundary matched '{name}' (request {})",
        request.id
    ))
}
