//! Worker lifecycle errors

use application::ApplicationError;
use thiserror::Error;

/// Errors raised while registering, running or stopping workers
#[derive(Debug, Error)]
pub enum WorkerError {
    /// `start` was called without any registered worker
    #[error("No workers registered")]
    NoWorkers,

    /// The manager was already started
    #[error("Worker manager already started")]
    AlreadyStarted,

    /// `stop` was called before `start`
    #[error("Worker manager not started")]
    NotStarted,

    /// Workers did not finish within the grace period
    #[error("Workers did not stop within {timeout_secs} seconds")]
    ShutdownTimeout {
        /// The grace period in seconds
        timeout_secs: u64,
    },

    /// A non-retryable stream error ended a worker
    #[error("Stream error: {0}")]
    Stream(#[from] ApplicationError),

    /// A worker task panicked or was aborted
    #[error("Worker task failed: {0}")]
    TaskFailed(String),
}
