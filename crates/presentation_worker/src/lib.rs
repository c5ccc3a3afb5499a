//! Presentation layer - Stream workers
//!
//! Consumes enrichment requests from a durable stream, runs them through the
//! [`application::ports::LocationEnricher`] and publishes the results.

pub mod error;
pub mod workers;

pub use error::WorkerError;
pub use workers::{
    StreamWorker, StreamWorkerSettings, Worker, WorkerManager, WorkerState, WorkerStats,
    WorkerStatsSnapshot,
};
