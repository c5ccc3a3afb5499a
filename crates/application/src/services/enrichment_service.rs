//! Enrichment orchestrator
//!
//! Combines boundary resolution, nearby transport and (optionally) routed
//! walking distances into one result per request. Only boundary failure is
//! fatal for a request; transport and routing failures degrade to a
//! boundary-only or straight-line result.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    BatchEnrichResponse, EnrichRequest, EnrichResult, EnrichedLocation, GeoLocation, NearbyStation,
};
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use super::{BoundaryResolver, PriorityTransportSearch, RoutingBatchScheduler};
use crate::error::ApplicationError;
use crate::ports::LocationEnricher;

/// Orchestrates the enrichment of location records
pub struct EnrichmentService {
    resolver: BoundaryResolver,
    transport: PriorityTransportSearch,
    scheduler: Option<Arc<RoutingBatchScheduler>>,
}

impl std::fmt::Debug for EnrichmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentService")
            .field("transport", &self.transport)
            .field("routing", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

impl EnrichmentService {
    /// Create a service without routed walking distances
    #[must_use]
    pub const fn new(resolver: BoundaryResolver, transport: PriorityTransportSearch) -> Self {
        Self {
            resolver,
            transport,
            scheduler: None,
        }
    }

    /// Use a routing scheduler for requests with a full street address
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<RoutingBatchScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Enrich many requests; the response is index-aligned with `requests`
    ///
    /// Boundaries are resolved with the batched resolver and transport with
    /// the batched search, concurrently.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn enrich_batch(&self, requests: &[EnrichRequest]) -> BatchEnrichResponse {
        let mut transport_indices = Vec::new();
        let mut points = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            if let Some(location) = transport_location(request) {
                transport_indices.push(index);
                points.push(location);
            }
        }

        let (boundaries, transport) = tokio::join!(
            self.resolver.resolve_batch(requests),
            self.transport.find_nearby_batch(&points)
        );

        let mut stations: Vec<Option<Vec<NearbyStation>>> = requests.iter().map(|_| None).collect();
        match transport {
            Ok(grouped) => {
                for (index, found) in transport_indices.into_iter().zip(grouped) {
                    stations[index] = Some(found);
                }
            },
            Err(e) => {
                warn!(error = %e, "Batch transport lookup failed, continuing without stations");
            },
        }

        let stations = join_all(requests.iter().zip(stations).map(|(request, found)| async move {
            match found {
                Some(mut found) => {
                    if let Some(origin) = transport_location(request) {
                        self.apply_routing(request, origin, &mut found).await;
                    }
                    Some(found)
                },
                None => None,
            }
        }))
        .await;

        let results: Vec<EnrichResult> = requests
            .iter()
            .zip(boundaries)
            .zip(stations)
            .map(|((request, boundary), found)| match boundary {
                Ok(location) => EnrichResult::success(request.id.clone(), location, found),
                Err(e) => EnrichResult::failure(request.id.clone(), e.to_string()),
            })
            .collect();

        let response = BatchEnrichResponse::from_results(results);
        debug!(
            succeeded = response.succeeded,
            failed = response.failed,
            "Batch enrichment finished"
        );
        response
    }

    async fn try_enrich(
        &self,
        request: &EnrichRequest,
    ) -> Result<(EnrichedLocation, Option<Vec<NearbyStation>>), ApplicationError> {
        request.location()?;

        let (boundaries, stations) =
            tokio::join!(self.resolver.resolve(request), self.nearby_stations(request));
        Ok((boundaries?, stations))
    }

    /// Nearby stations for visible requests with coordinates; failures degrade to `None`
    async fn nearby_stations(&self, request: &EnrichRequest) -> Option<Vec<NearbyStation>> {
        let origin = transport_location(request)?;
        match self.transport.find_nearby(origin).await {
            Ok(mut stations) => {
                self.apply_routing(request, origin, &mut stations).await;
                Some(stations)
            },
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "Transport lookup failed");
                None
            },
        }
    }

    /// Replace straight-line walking estimates with routed ones where available
    async fn apply_routing(
        &self,
        request: &EnrichRequest,
        origin: GeoLocation,
        stations: &mut [NearbyStation],
    ) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        if stations.is_empty() || !request.has_full_address() {
            return;
        }

        let destinations = stations.iter().map(NearbyStation::location).collect();
        let result = scheduler.request(&request.id, origin, destinations).await;
        if let Some(error) = &result.error {
            debug!(request_id = %request.id, error = %error, "Using estimated walking distances");
        }
        for (station, route) in stations.iter_mut().zip(&result.routes) {
            if let Some(estimate) = route.routed_estimate() {
                station.set_walking(estimate);
            }
        }
    }
}

#[async_trait]
impl LocationEnricher for EnrichmentService {
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    async fn enrich(&self, request: &EnrichRequest) -> EnrichResult {
        match self.try_enrich(request).await {
            Ok((location, stations)) => {
                debug!(
                    levels = location.populated_count(),
                    stations = stations.as_ref().map_or(0, Vec::len),
                    "Request enriched"
                );
                EnrichResult::success(request.id.clone(), location, stations)
            },
            Err(e) => {
                debug!(error = %e, "Enrichment failed");
                EnrichResult::failure(request.id.clone(), e.to_string())
            },
        }
    }
}

/// Coordinates to search transport around, only for visible requests with valid coordinates
fn transport_location(request: &EnrichRequest) -> Option<GeoLocation> {
    if !request.visible {
        return None;
    }
    request.location().ok().flatten()
}
