//! Domain entities - requests, resolved hierarchies, stations, results

mod boundary;
mod enrich_request;
mod enrich_result;
mod station;

pub use boundary::{AdminBoundary, BoundaryInfo, EnrichedLocation};
pub use enrich_request::EnrichRequest;
pub use enrich_result::{BatchEnrichResponse, EnrichResult};
pub use station::{
    LineInfo, NearbyStation, StationCandidate, dedup_lines, dedup_stations, normalized_name_key,
};
