//! Application services - Use case implementations

mod boundary_resolver;
mod enrichment_service;
mod routing_scheduler;
mod transport_search;

pub use boundary_resolver::{BoundaryResolver, MAX_PARENT_HOPS};
pub use enrichment_service::EnrichmentService;
pub use routing_scheduler::{
    RoutingBatchItem, RoutingBatchResult, RoutingBatchScheduler, RoutingSchedulerConfig,
    SCHEDULER_STOPPED, WalkingRoute,
};
pub use transport_search::{
    DEFAULT_LIMIT, DEFAULT_RADIUS_M, PriorityTransportSearch, TransportSearchConfig,
};
