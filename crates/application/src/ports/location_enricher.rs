//! Location enrichment port, exposed to the stream workers

use async_trait::async_trait;
use domain::{EnrichRequest, EnrichResult};
#[cfg(test)]
use mockall::automock;

/// Turns one request into one result
///
/// Failures are reported inside the result (`error`), never as a panic or
/// a dropped request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LocationEnricher: Send + Sync {
    /// Enrich a single request
    async fn enrich(&self, request: &EnrichRequest) -> EnrichResult;
}
