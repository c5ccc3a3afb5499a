//! Port definitions for application layer
//!
//! Ports are interfaces that define how the enrichment pipeline interacts
//! with external systems. Adapters in the infrastructure layer implement them.

mod boundary_store;
mod event_stream_port;
mod location_enricher;
mod routing_matrix_port;
mod transport_store;

#[cfg(test)]
pub use boundary_store::MockBoundaryStore;
pub use boundary_store::{BoundaryStore, NameSearchHit, NameSearchTerm};
#[cfg(test)]
pub use event_stream_port::MockEventStreamPort;
pub use event_stream_port::{
    DATA_FIELD, EventStreamPort, NEW_MESSAGES, PENDING_MESSAGES, StreamMessage,
};
pub use location_enricher::LocationEnricher;
#[cfg(test)]
pub use location_enricher::MockLocationEnricher;
#[cfg(test)]
pub use routing_matrix_port::MockRoutingMatrixPort;
pub use routing_matrix_port::{RoutingMatrix, RoutingMatrixPort};
#[cfg(test)]
pub use transport_store::MockTransportStore;
pub use transport_store::TransportStore;
