//! Worker lifecycle supervision
//!
//! Each registered worker runs on its own task. Shutdown signals every
//! worker, cancels the shared token and waits for the tasks up to a fixed
//! grace period. Tasks still running after the grace period are left alone.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::Worker;
use crate::error::WorkerError;

/// Grace period for `stop` when none is configured
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
struct ManagerState {
    workers: Vec<Arc<dyn Worker>>,
    handles: Vec<JoinHandle<Result<(), WorkerError>>>,
    cancel: Option<CancellationToken>,
    started: bool,
}

/// Supervises a fixed set of workers
pub struct WorkerManager {
    state: Mutex<ManagerState>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for WorkerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WorkerManager")
            .field("workers", &state.workers.len())
            .field("started", &state.started)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

impl WorkerManager {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(ManagerState::default()),
            shutdown_timeout,
        }
    }

    /// Add a worker; only allowed before `start`
    pub fn register(&self, worker: Arc<dyn Worker>) -> Result<(), WorkerError> {
        let mut state = self.state.lock();
        if state.started {
            return Err(WorkerError::AlreadyStarted);
        }
        info!(worker = worker.name(), "Registered worker");
        state.workers.push(worker);
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Spawn every registered worker under a child of `cancel`
    pub fn start(&self, cancel: &CancellationToken) -> Result<(), WorkerError> {
        let mut state = self.state.lock();
        if state.started {
            return Err(WorkerError::AlreadyStarted);
        }
        if state.workers.is_empty() {
            return Err(WorkerError::NoWorkers);
        }

        let token = cancel.child_token();
        let handles: Vec<_> = state
            .workers
            .iter()
            .map(|worker| {
                let worker = Arc::clone(worker);
                let token = token.clone();
                tokio::spawn(async move {
                    let result = worker.start(token).await;
                    if let Err(ref e) = result {
                        error!(worker = worker.name(), error = %e, "Worker exited with error");
                    }
                    result
                })
            })
            .collect();

        info!(workers = handles.len(), "Workers started");
        state.handles = handles;
        state.cancel = Some(token);
        state.started = true;
        Ok(())
    }

    /// Signal all workers and wait up to the grace period for them to finish
    pub async fn stop(&self) -> Result<(), WorkerError> {
        let handles = {
            let mut state = self.state.lock();
            if !state.started {
                return Err(WorkerError::NotStarted);
            }
            for worker in &state.workers {
                worker.stop();
            }
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            std::mem::take(&mut state.handles)
        };

        info!(
            workers = handles.len(),
            timeout_secs = self.shutdown_timeout.as_secs(),
            "Stopping workers"
        );
        let Ok(results) = tokio::time::timeout(self.shutdown_timeout, join_all(handles)).await
        else {
            warn!("Workers did not stop within the shutdown timeout");
            return Err(WorkerError::ShutdownTimeout {
                timeout_secs: self.shutdown_timeout.as_secs(),
            });
        };

        let mut first_error = None;
        for result in results {
            let outcome = result.map_err(|e| WorkerError::TaskFailed(e.to_string()));
            if let Err(e) = outcome.and_then(|r| r) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!("All workers stopped");
                Ok(())
            },
        }
    }
}
