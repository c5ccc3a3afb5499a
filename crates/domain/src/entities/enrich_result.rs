//! Enrichment results as published to the result stream

use serde::{Deserialize, Serialize};

use super::{boundary::EnrichedLocation, station::NearbyStation};

/// Outcome of enriching one request
///
/// A result with a location and no stations is a valid partial success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichResult {
    /// Correlation id of the request
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<EnrichedLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_stations: Option<Vec<NearbyStation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichResult {
    /// Successful result
    pub fn success(
        id: impl Into<String>,
        location: EnrichedLocation,
        nearby_stations: Option<Vec<NearbyStation>>,
    ) -> Self {
        Self {
            id: id.into(),
            location: Some(location),
            nearby_stations,
            error: None,
        }
    }

    /// Failed result carrying a caller-visible error
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: None,
            nearby_stations: None,
            error: Some(error.into()),
        }
    }

    /// Whether the location was resolved
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none() && self.location.is_some()
    }
}

/// Results of a batch call, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEnrichResponse {
    pub results: Vec<EnrichResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchEnrichResponse {
    /// Wrap results and count outcomes
    #[must_use]
    pub fn from_results(results: Vec<EnrichResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }
}
