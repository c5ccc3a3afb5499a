//! Background workers and their lifecycle manager

mod stream_worker;
#[cfg(test)]
mod test_support;
mod worker_manager;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

pub use stream_worker::{
    StreamWorker, StreamWorkerSettings, WorkerState, WorkerStats, WorkerStatsSnapshot,
};
pub use worker_manager::{DEFAULT_SHUTDOWN_TIMEOUT, WorkerManager};

/// A long-running unit of work
#[async_trait]
pub trait Worker: Send + Sync + std::fmt::Debug {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run until `cancel` fires or [`Worker::stop`] is called
    async fn start(&self, cancel: CancellationToken) -> Result<(), WorkerError>;

    /// Ask the worker to stop; returns without waiting
    fn stop(&self);
}
