//! Routing-matrix batch scheduler
//!
//! Aggregates walking-distance requests from many concurrent enrichments
//! into bounded routing-matrix calls. A single background task owns the
//! queue; each flush runs on its own task so API latency does not hold up
//! the next batch. Every item is answered exactly once on its oneshot.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use domain::{GeoLocation, WalkingEstimate, round_to};
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{RoutingMatrix, RoutingMatrixPort};

/// Error attached to items still queued when the scheduler stops
pub const SCHEDULER_STOPPED: &str = "routing scheduler stopped";

/// Batching behaviour of the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSchedulerConfig {
    /// Whether routed walking distances are requested at all (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Queued items that trigger an immediate flush (default: 10)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum time an item waits before a flush in milliseconds (default: 1000)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Origins plus destinations allowed in one matrix call (default: 25)
    #[serde(default = "default_max_coordinates")]
    pub max_coordinates: usize,

    /// Capacity of the request queue (default: 1024)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Deadline for a caller awaiting its result in milliseconds (default: 5000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

const fn default_batch_size() -> usize {
    10
}

const fn default_flush_interval_ms() -> u64 {
    1000
}

const fn default_max_coordinates() -> usize {
    25
}

const fn default_queue_capacity() -> usize {
    1024
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for RoutingSchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            max_coordinates: default_max_coordinates(),
            queue_capacity: default_queue_capacity(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RoutingSchedulerConfig {
    /// Flush interval as a Duration
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Caller deadline as a Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("scheduler batch_size must be greater than zero".to_string());
        }
        if self.flush_interval_ms == 0 {
            return Err("scheduler flush_interval_ms must be greater than zero".to_string());
        }
        if self.max_coordinates < 2 {
            return Err("scheduler max_coordinates must be at least 2".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("scheduler queue_capacity must be greater than zero".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("scheduler request_timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Walking route to one destination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkingRoute {
    /// Straight-line distance in meters, 2 decimals, always present
    pub linear_distance_m: f64,
    /// Routed distance in meters
    pub distance_m: Option<f64>,
    /// Routed duration in seconds
    pub duration_s: Option<f64>,
}

impl WalkingRoute {
    /// Route with only the straight-line distance
    #[must_use]
    pub fn linear(origin: &GeoLocation, destination: &GeoLocation) -> Self {
        Self {
            linear_distance_m: round_to(origin.distance_m(destination), 2),
            distance_m: None,
            duration_s: None,
        }
    }

    /// Walking estimate from the routed values, if the router connected the pair
    #[must_use]
    pub fn routed_estimate(&self) -> Option<WalkingEstimate> {
        match (self.distance_m, self.duration_s) {
            (Some(distance), Some(duration)) => {
                Some(WalkingEstimate::from_route(distance, duration))
            },
            _ => None,
        }
    }

    /// Routed estimate, or the straight-line heuristic when unrouted
    #[must_use]
    pub fn estimate(&self) -> WalkingEstimate {
        self.routed_estimate()
            .unwrap_or_else(|| WalkingEstimate::from_linear(self.linear_distance_m))
    }
}

/// Answer to one [`RoutingBatchItem`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingBatchResult {
    /// Correlation id of the item
    pub id: String,
    /// One route per destination, in request order
    pub routes: Vec<WalkingRoute>,
    /// Set when routed values are missing because of a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoutingBatchResult {
    /// Straight-line distances only, with an optional error
    #[must_use]
    pub fn linear_only(
        id: impl Into<String>,
        origin: &GeoLocation,
        destinations: &[GeoLocation],
        error: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            routes: destinations
                .iter()
                .map(|destination| WalkingRoute::linear(origin, destination))
                .collect(),
            error,
        }
    }
}

/// A pending walking-distance request
///
/// The responder is consumed when the result is delivered, so an item can
/// only ever be answered once.
#[derive(Debug)]
pub struct RoutingBatchItem {
    pub id: String,
    pub origin: GeoLocation,
    pub destinations: Vec<GeoLocation>,
    respond_to: oneshot::Sender<RoutingBatchResult>,
}

impl RoutingBatchItem {
    /// Create an item and the receiver its result arrives on
    pub fn new(
        id: impl Into<String>,
        origin: GeoLocation,
        destinations: Vec<GeoLocation>,
    ) -> (Self, oneshot::Receiver<RoutingBatchResult>) {
        let (respond_to, receiver) = oneshot::channel();
        (
            Self {
                id: id.into(),
                origin,
                destinations,
                respond_to,
            },
            receiver,
        )
    }

    fn coordinate_count(&self) -> usize {
        1 + self.destinations.len()
    }

    fn respond(self, result: RoutingBatchResult) {
        if self.respond_to.send(result).is_err() {
            debug!(id = %self.id, "Routing caller went away before its result");
        }
    }

    fn respond_linear(self, error: Option<String>) {
        let result = RoutingBatchResult::linear_only(
            self.id.clone(),
            &self.origin,
            &self.destinations,
            error,
        );
        self.respond(result);
    }

    fn respond_from_matrix(self, matrix: &RoutingMatrix, row: usize, columns: Range<usize>) {
        let routes = self
            .destinations
            .iter()
            .zip(columns)
            .map(|(destination, column)| WalkingRoute {
                linear_distance_m: round_to(self.origin.distance_m(destination), 2),
                distance_m: matrix.distance(row, column),
                duration_s: matrix.duration(row, column),
            })
            .collect();
        let result = RoutingBatchResult {
            id: self.id.clone(),
            routes,
            error: None,
        };
        self.respond(result);
    }
}

/// Batches walking-distance requests into routing-matrix calls
pub struct RoutingBatchScheduler {
    config: RoutingSchedulerConfig,
    routing: Arc<dyn RoutingMatrixPort>,
    sender: mpsc::Sender<RoutingBatchItem>,
    receiver: Option<mpsc::Receiver<RoutingBatchItem>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RoutingBatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingBatchScheduler")
            .field("config", &self.config)
            .field("started", &self.receiver.is_none())
            .finish_non_exhaustive()
    }
}

impl RoutingBatchScheduler {
    /// Create a stopped scheduler
    #[must_use]
    pub fn new(routing: Arc<dyn RoutingMatrixPort>, config: RoutingSchedulerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            config,
            routing,
            sender,
            receiver: Some(receiver),
            cancel: CancellationToken::new(),
        }
    }

    /// Scheduler configuration
    #[must_use]
    pub const fn config(&self) -> &RoutingSchedulerConfig {
        &self.config
    }

    /// Spawn the aggregation loop
    ///
    /// The loop ends when `parent` is cancelled or [`Self::stop`] is called.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the scheduler was already started.
    pub fn start(
        &mut self,
        parent: &CancellationToken,
    ) -> Result<JoinHandle<()>, ApplicationError> {
        let receiver = self.receiver.take().ok_or_else(|| {
            ApplicationError::Internal("routing scheduler already started".to_string())
        })?;
        self.cancel = parent.child_token();

        info!(
            batch_size = self.config.batch_size,
            flush_interval_ms = self.config.flush_interval_ms,
            max_coordinates = self.config.max_coordinates,
            "Starting routing batch scheduler"
        );
        Ok(tokio::spawn(run_loop(
            receiver,
            Arc::clone(&self.routing),
            self.config.clone(),
            self.cancel.clone(),
        )))
    }

    /// Stop the aggregation loop; still-queued items get linear-only results
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Enqueue an item without waiting
    ///
    /// Items without destinations are answered immediately.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` when the queue is full or the scheduler stopped;
    /// the item is dropped and its receiver closes.
    pub fn schedule(&self, item: RoutingBatchItem) -> Result<(), ApplicationError> {
        if item.destinations.is_empty() {
            item.respond_linear(None);
            return Ok(());
        }
        self.sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => {
                warn!(id = %item.id, "Routing queue full");
                ApplicationError::UpstreamUnavailable("routing queue full".to_string())
            },
            mpsc::error::TrySendError::Closed(_) => {
                ApplicationError::UpstreamUnavailable(SCHEDULER_STOPPED.to_string())
            },
        })
    }

    /// Schedule and await the result under the configured deadline
    ///
    /// Never fails: on a full queue, timeout or shutdown the caller gets
    /// straight-line distances with the reason in `error`.
    #[instrument(skip(self, destinations), fields(destinations = destinations.len()))]
    pub async fn request(
        &self,
        id: &str,
        origin: GeoLocation,
        destinations: Vec<GeoLocation>,
    ) -> RoutingBatchResult {
        if destinations.is_empty() {
            return RoutingBatchResult::linear_only(id, &origin, &[], None);
        }
        let (item, receiver) = RoutingBatchItem::new(id, origin, destinations.clone());
        if let Err(e) = self.schedule(item) {
            return RoutingBatchResult::linear_only(id, &origin, &destinations, Some(e.to_string()));
        }

        match timeout(self.config.request_timeout(), receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => RoutingBatchResult::linear_only(
                id,
                &origin,
                &destinations,
                Some(SCHEDULER_STOPPED.to_string()),
            ),
            Err(_) => {
                warn!(id, "Routing request timed out");
                RoutingBatchResult::linear_only(
                    id,
                    &origin,
                    &destinations,
                    Some("routing request timed out".to_string()),
                )
            },
        }
    }
}

async fn run_loop(
    mut receiver: mpsc::Receiver<RoutingBatchItem>,
    routing: Arc<dyn RoutingMatrixPort>,
    config: RoutingSchedulerConfig,
    cancel: CancellationToken,
) {
    let period = config.flush_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<RoutingBatchItem> = Vec::with_capacity(config.batch_size);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = receiver.recv() => {
                let Some(item) = received else { break };
                pending.push(item);
                if pending.len() >= config.batch_size {
                    spawn_flush(std::mem::take(&mut pending), &routing, config.max_coordinates);
                    ticker.reset();
                }
            },
            _ = ticker.tick() => {
                if !pending.is_empty() {
                    spawn_flush(std::mem::take(&mut pending), &routing, config.max_coordinates);
                }
            },
        }
    }

    receiver.close();
    while let Ok(item) = receiver.try_recv() {
        pending.push(item);
    }
    if !pending.is_empty() {
        info!(count = pending.len(), "Answering queued routing requests on shutdown");
    }
    for item in pending {
        item.respond_linear(Some(SCHEDULER_STOPPED.to_string()));
    }
    info!("Routing batch scheduler stopped");
}

fn spawn_flush(
    batch: Vec<RoutingBatchItem>,
    routing: &Arc<dyn RoutingMatrixPort>,
    max_coordinates: usize,
) {
    let routing = Arc::clone(routing);
    tokio::spawn(async move { flush(batch, routing.as_ref(), max_coordinates).await });
}

/// Answer every item of a drained batch
async fn flush(
    batch: Vec<RoutingBatchItem>,
    routing: &dyn RoutingMatrixPort,
    max_coordinates: usize,
) {
    let coordinates: usize = batch.iter().map(RoutingBatchItem::coordinate_count).sum();
    debug!(items = batch.len(), coordinates, "Flushing routing batch");

    if coordinates <= max_coordinates {
        flush_combined(batch, routing).await;
    } else {
        join_all(batch.into_iter().map(|item| flush_single(item, routing))).await;
    }
}

/// One matrix call for the whole batch: one origin row per item, destinations concatenated
async fn flush_combined(batch: Vec<RoutingBatchItem>, routing: &dyn RoutingMatrixPort) {
    counter!("routing_matrix_calls_total", "mode" => "batch").increment(1);
    let origins: Vec<GeoLocation> = batch.iter().map(|item| item.origin).collect();
    let mut destinations = Vec::new();
    let mut ranges = Vec::with_capacity(batch.len());
    for item in &batch {
        let start = destinations.len();
        destinations.extend_from_slice(&item.destinations);
        ranges.push(start..destinations.len());
    }

    match routing.matrix(&origins, &destinations).await {
        Ok(matrix) => {
            for (row, (item, columns)) in batch.into_iter().zip(ranges).enumerate() {
                item.respond_from_matrix(&matrix, row, columns);
            }
        },
        Err(e) => {
            warn!(error = %e, items = origins.len(), "Routing matrix call failed");
            let message = e.to_string();
            for item in batch {
                item.respond_linear(Some(message.clone()));
            }
        },
    }
}

async fn flush_single(item: RoutingBatchItem, routing: &dyn RoutingMatrixPort) {
    counter!("routing_matrix_calls_total", "mode" => "single").increment(1);
    match routing.matrix(&[item.origin], &item.destinations).await {
        Ok(matrix) => {
            let columns = 0..item.destinations.len();
            item.respond_from_matrix(&matrix, 0, columns);
        },
        Err(e) => {
            warn!(error = %e, id = %item.id, "Routing matrix call failed");
            item.respond_linear(Some(e.to_string()));
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::ports::MockRoutingMatrixPort;

    /// Router returning distance = 1000 × origin row + column, recording call shapes
    #[derive(Debug, Default)]
    struct CountingRouter {
        calls: AtomicUsize,
        shapes: Mutex<Vec<(usize, usize)>>,
        delay: Duration,
    }

    #[async_trait]
    impl RoutingMatrixPort for CountingRouter {
        async fn matrix(
            &self,
            origins: &[GeoLocation],
            destinations: &[GeoLocation],
        ) -> Result<RoutingMatrix, ApplicationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.shapes.lock().push((origins.len(), destinations.len()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let cell = |o: usize, d: usize| Some((o * 1000 + d) as f64);
            Ok(RoutingMatrix {
                distances: (0..origins.len())
                    .map(|o| (0..destinations.len()).map(|d| cell(o, d)).collect())
                    .collect(),
                durations: (0..origins.len())
                    .map(|o| (0..destinations.len()).map(|d| cell(o, d)).collect())
                    .collect(),
            })
        }
    }

    fn config(batch_size: usize, flush_interval_ms: u64) -> RoutingSchedulerConfig {
        RoutingSchedulerConfig {
            enabled: true,
            batch_size,
            flush_interval_ms,
            ..Default::default()
        }
    }

    fn origin() -> GeoLocation {
        GeoLocation::new_unchecked(41.3851, 2.1734)
    }

    fn destination(offset: f64) -> GeoLocation {
        GeoLocation::new_unchecked(41.3851 + offset, 2.1734)
    }

    fn started(
        router: Arc<dyn RoutingMatrixPort>,
        config: RoutingSchedulerConfig,
    ) -> (Arc<RoutingBatchScheduler>, CancellationToken, JoinHandle<()>) {
        let cancel = CancellationToken::new();
        let mut scheduler = RoutingBatchScheduler::new(router, config);
        let handle = scheduler.start(&cancel).unwrap();
        (Arc::new(scheduler), cancel, handle)
    }

    #[tokio::test]
    async fn thirty_concurrent_requests_make_at_least_three_calls() {
        let router = Arc::new(CountingRouter {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let (scheduler, cancel, _) = started(router.clone(), config(10, 200));
        // flush interval + router latency + scheduling slack
        let max_wait = Duration::from_millis(200 + 50 + 250);

        let tasks: Vec<_> = (0..30)
            .map(|i| {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    let id = format!("req-{i}");
                    let request = scheduler.request(&id, origin(), vec![destination(0.001)]);
                    tokio::time::timeout(max_wait, request).await
                })
            })
            .collect();
        let results: Vec<RoutingBatchResult> = join_all(tasks)
            .await
            .into_iter()
            .enumerate()
            .map(|(i, joined)| {
                joined
                    .unwrap()
                    .unwrap_or_else(|_| panic!("req-{i} waited longer than {max_wait:?}"))
            })
            .collect();

        assert_eq!(results.len(), 30);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.id, format!("req-{i}"));
            assert_eq!(result.routes.len(), 1);
            assert!(result.error.is_none());
            assert!(result.routes[0].distance_m.is_some());
        }
        assert!(router.calls.load(Ordering::SeqCst) >= 3);
        cancel.cancel();
    }

    #[tokio::test]
    async fn batch_within_ceiling_uses_one_call() {
        let router = Arc::new(CountingRouter::default());
        let (scheduler, cancel, _) = started(router.clone(), config(3, 60_000));

        let (a, b, c) = tokio::join!(
            scheduler.request("a", origin(), vec![destination(0.001), destination(0.002)]),
            scheduler.request("b", origin(), vec![destination(0.003)]),
            scheduler.request("c", origin(), vec![destination(0.004), destination(0.005)]),
        );

        assert_eq!(router.calls.load(Ordering::SeqCst), 1);
        assert_eq!(router.shapes.lock().clone(), vec![(3, 5)]);
        // Row per item in arrival order, columns sliced from the concatenated destinations
        let routed = |r: &RoutingBatchResult| -> Vec<Option<f64>> {
            r.routes.iter().map(|w| w.distance_m).collect()
        };
        assert_eq!(routed(&a), vec![Some(0.0), Some(1.0)]);
        assert_eq!(routed(&b), vec![Some(1002.0)]);
        assert_eq!(routed(&c), vec![Some(2003.0), Some(2004.0)]);
        cancel.cancel();
    }

    #[tokio::test]
    async fn batch_beyond_ceiling_uses_one_call_per_item() {
        let router = Arc::new(CountingRouter::default());
        let (scheduler, cancel, _) = started(router.clone(), config(4, 60_000));

        let destinations: Vec<GeoLocation> =
            (1..=6).map(|i| destination(f64::from(i) * 0.001)).collect();
        let (r1, r2, r3, r4) = tokio::join!(
            scheduler.request("1", origin(), destinations.clone()),
            scheduler.request("2", origin(), destinations.clone()),
            scheduler.request("3", origin(), destinations.clone()),
            scheduler.request("4", origin(), destinations.clone()),
        );

        // 4 origins + 24 destinations > 25
        assert_eq!(router.calls.load(Ordering::SeqCst), 4);
        assert!(router.shapes.lock().iter().all(|shape| *shape == (1, 6)));
        for result in [r1, r2, r3, r4] {
            assert_eq!(result.routes.len(), 6);
            assert_eq!(result.routes[5].distance_m, Some(5.0));
        }
        cancel.cancel();
    }

    #[tokio::test]
    async fn interval_flushes_partial_batch() {
        let router = Arc::new(CountingRouter::default());
        let (scheduler, cancel, _) = started(router.clone(), config(10, 50));

        let result = scheduler
            .request("lonely", origin(), vec![destination(0.002)])
            .await;

        assert!(result.error.is_none());
        assert_eq!(router.calls.load(Ordering::SeqCst), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn api_error_yields_linear_distances_with_error() {
        let mut router = MockRoutingMatrixPort::new();
        router
            .expect_matrix()
            .returning(|_, _| Err(ApplicationError::UpstreamUnavailable("HTTP 503".to_string())));
        let (scheduler, cancel, _) = started(Arc::new(router), config(1, 60_000));

        let result = scheduler
            .request("x", origin(), vec![destination(0.001), destination(0.002)])
            .await;

        assert!(result.error.as_deref().unwrap().contains("HTTP 503"));
        assert_eq!(result.routes.len(), 2);
        assert!(result.routes.iter().all(|r| r.distance_m.is_none()));
        assert!(result.routes[0].linear_distance_m > 100.0);
        assert!(result.routes[1].linear_distance_m > result.routes[0].linear_distance_m);
        cancel.cancel();
    }

    #[tokio::test]
    async fn empty_destinations_answered_without_api_call() {
        let mut router = MockRoutingMatrixPort::new();
        router.expect_matrix().never();
        let (scheduler, cancel, _) = started(Arc::new(router), config(10, 60_000));

        let result = scheduler.request("empty", origin(), Vec::new()).await;
        assert!(result.routes.is_empty());
        assert!(result.error.is_none());

        let (item, receiver) = RoutingBatchItem::new("item", origin(), Vec::new());
        scheduler.schedule(item).unwrap();
        let result = receiver.await.unwrap();
        assert_eq!(result.id, "item");
        assert!(result.routes.is_empty());
        cancel.cancel();
    }

    #[tokio::test]
    async fn stop_answers_queued_items() {
        let router = Arc::new(CountingRouter::default());
        let (scheduler, _cancel, handle) = started(router.clone(), config(100, 60_000));

        let (item, receiver) = RoutingBatchItem::new("queued", origin(), vec![destination(0.001)]);
        scheduler.schedule(item).unwrap();
        tokio::task::yield_now().await;
        scheduler.stop();
        handle.await.unwrap();

        let result = receiver.await.unwrap();
        assert_eq!(result.error.as_deref(), Some(SCHEDULER_STOPPED));
        assert_eq!(result.routes.len(), 1);
        assert!(result.routes[0].distance_m.is_none());
        assert_eq!(router.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn schedule_after_stop_is_reported() {
        let router = Arc::new(CountingRouter::default());
        let (scheduler, _cancel, handle) = started(router, config(10, 60_000));
        scheduler.stop();
        handle.await.unwrap();

        let (item, _receiver) = RoutingBatchItem::new("late", origin(), vec![destination(0.001)]);
        let err = scheduler.schedule(item).unwrap_err();
        assert!(err.to_string().contains(SCHEDULER_STOPPED));

        let result = scheduler.request("late", origin(), vec![destination(0.001)]).await;
        assert!(result.error.is_some());
        assert_eq!(result.routes.len(), 1);
    }

    #[tokio::test]
    async fn full_queue_is_reported() {
        let router = Arc::new(CountingRouter::default());
        let config = RoutingSchedulerConfig {
            queue_capacity: 1,
            ..config(10, 60_000)
        };
        // Not started: nothing drains the queue
        let scheduler = RoutingBatchScheduler::new(router, config);

        let (first, _r1) = RoutingBatchItem::new("1", origin(), vec![destination(0.001)]);
        let (second, _r2) = RoutingBatchItem::new("2", origin(), vec![destination(0.001)]);
        scheduler.schedule(first).unwrap();
        let err = scheduler.schedule(second).unwrap_err();
        assert!(err.to_string().contains("queue full"));
    }

    #[tokio::test]
    async fn request_times_out_with_linear_result() {
        let router = Arc::new(CountingRouter {
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let config = RoutingSchedulerConfig {
            request_timeout_ms: 50,
            ..config(1, 60_000)
        };
        let (scheduler, cancel, _) = started(router, config);

        let result = scheduler.request("slow", origin(), vec![destination(0.001)]).await;

        assert_eq!(result.error.as_deref(), Some("routing request timed out"));
        assert!(result.routes[0].distance_m.is_none());
        cancel.cancel();
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let router = Arc::new(CountingRouter::default());
        let cancel = CancellationToken::new();
        let mut scheduler = RoutingBatchScheduler::new(router, config(10, 1000));
        let _handle = scheduler.start(&cancel).unwrap();
        assert!(scheduler.start(&cancel).is_err());
        cancel.cancel();
    }

    #[test]
    fn walking_route_estimate_prefers_routed_values() {
        let routed = WalkingRoute {
            linear_distance_m: 500.0,
            distance_m: Some(700.0),
            duration_s: Some(540.0),
        };
        assert_eq!(routed.estimate(), WalkingEstimate::from_route(700.0, 540.0));

        let linear = WalkingRoute {
            linear_distance_m: 500.0,
            distance_m: Some(700.0),
            duration_s: None,
        };
        assert!(linear.routed_estimate().is_none());
        assert_eq!(linear.estimate(), WalkingEstimate::from_linear(500.0));
    }

    #[test]
    fn config_defaults_and_validation() {
        let config = RoutingSchedulerConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
        assert_eq!(config.max_coordinates, 25);
        assert!(config.validate().is_ok());

        let invalid = RoutingSchedulerConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }
}
