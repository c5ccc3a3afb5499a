//! Stream consumer worker
//!
//! Reads enrichment requests from the input stream under a consumer group,
//! enriches each one and publishes the result. A message is acknowledged
//! once its result has been published, or when it can never be processed.
//!
//! Unacknowledged messages stay in the consumer's pending list. The worker
//! re-reads that list on start, after a failed read, and after a batch left
//! messages unacknowledged, before it goes back to new messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use application::ports::{
    EventStreamPort, LocationEnricher, NEW_MESSAGES, PENDING_MESSAGES, StreamMessage,
};
use application::ApplicationError;
use async_trait::async_trait;
use domain::EnrichRequest;
use infrastructure::StreamConfig;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::Worker;
use crate::error::WorkerError;

/// Connection-independent settings of one stream worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamWorkerSettings {
    pub input_stream: String,
    pub result_stream: String,
    pub group: String,
    pub consumer: String,
    pub read_count: usize,
    pub block_ms: u64,
    pub retry_backoff_ms: u64,
}

impl StreamWorkerSettings {
    /// Settings for the `n`-th worker of the pool
    pub fn from_config(config: &StreamConfig, n: usize) -> Self {
        Self {
            input_stream: config.input_stream.clone(),
            result_stream: config.result_stream.clone(),
            group: config.group.clone(),
            consumer: config.consumer_name(n),
            read_count: config.read_count,
            block_ms: config.block_ms,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Short timings for tests
    pub fn for_testing(consumer: impl Into<String>) -> Self {
        Self {
            input_stream: "requests".to_string(),
            result_stream: "results".to_string(),
            group: "enricher".to_string(),
            consumer: consumer.into(),
            read_count: 10,
            block_ms: 10,
            retry_backoff_ms: 10,
        }
    }
}

/// Lifecycle state of a stream worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Reading = 1,
    Processing = 2,
    Acking = 3,
    Stopped = 4,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Reading,
            2 => Self::Processing,
            3 => Self::Acking,
            4 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Running counters of a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    failed: AtomicU64,
    poison: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStatsSnapshot {
    /// Messages whose result was published
    pub processed: u64,
    /// Published results carrying an error
    pub failed: u64,
    /// Messages acknowledged without processing
    pub poison: u64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            poison: self.poison.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of handling a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Published,
    Failed,
    Poison,
    Unpublished,
}

impl Outcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Poison => "poison",
            Self::Unpublished => "unpublished",
        }
    }
}

/// Position of the next read
///
/// While `pending_after` is set the worker walks its pending list in id
/// order; a pass ends on an empty read. `retry` schedules another pass for
/// messages that stayed unacknowledged during the current one.
#[derive(Debug, Default)]
struct ReadCursor {
    pending_after: Option<String>,
    retry: bool,
}

impl ReadCursor {
    fn pending() -> Self {
        let mut cursor = Self::default();
        cursor.restart_pending();
        cursor
    }

    fn restart_pending(&mut self) {
        self.pending_after = Some(PENDING_MESSAGES.to_string());
        self.retry = false;
    }

    fn start_id(&self) -> &str {
        self.pending_after.as_deref().unwrap_or(NEW_MESSAGES)
    }

    const fn is_pending(&self) -> bool {
        self.pending_after.is_some()
    }

    fn advance(&mut self, last_id: &str) {
        self.pending_after = Some(last_id.to_string());
    }

    /// Close the pending pass; returns whether another one is due
    fn finish_pass(&mut self) -> bool {
        self.pending_after = None;
        std::mem::take(&mut self.retry)
    }
}

/// Consumer-group worker turning enrichment requests into results
pub struct StreamWorker {
    name: String,
    stream: Arc<dyn EventStreamPort>,
    enricher: Arc<dyn LocationEnricher>,
    settings: StreamWorkerSettings,
    stop: CancellationToken,
    state: AtomicU8,
    stats: WorkerStats,
}

impl std::fmt::Debug for StreamWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWorker")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl StreamWorker {
    pub fn new(
        stream: Arc<dyn EventStreamPort>,
        enricher: Arc<dyn LocationEnricher>,
        settings: StreamWorkerSettings,
    ) -> Self {
        Self {
            name: format!("stream-worker:{}", settings.consumer),
            stream,
            enricher,
            settings,
            stop: CancellationToken::new(),
            state: AtomicU8::new(WorkerState::Idle as u8),
            stats: WorkerStats::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub const fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub const fn settings(&self) -> &StreamWorkerSettings {
        &self.settings
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Sleep for the retry backoff; returns `false` if cancelled meanwhile
    async fn backoff(&self, cancel: &CancellationToken) -> bool {
        let delay = Duration::from_millis(self.settings.retry_backoff_ms);
        tokio::select! {
            () = cancel.cancelled() => false,
            () = self.stop.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Create the consumer group, retrying while the stream is unreachable
    async fn ensure_group(&self, cancel: &CancellationToken) -> Result<bool, WorkerError> {
        loop {
            match self
                .stream
                .ensure_group(&self.settings.input_stream, &self.settings.group)
                .await
            {
                Ok(()) => return Ok(true),
                Err(e) if e.is_retryable() => {
                    warn!(worker = %self.name, error = %e, "Consumer group setup failed, retrying");
                    if !self.backoff(cancel).await {
                        return Ok(false);
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Process one message; returns whether it was acknowledged
    #[instrument(skip(self, message), fields(worker = %self.name, message_id = %message.id))]
    async fn handle(&self, message: &StreamMessage) -> bool {
        self.set_state(WorkerState::Processing);
        let outcome = match parse_request(message) {
            Ok(request) => self.enrich_and_publish(&request).await,
            Err(e) => {
                error!(error = %e, "Dropping unprocessable message");
                Outcome::Poison
            },
        };

        counter!("enrichment_messages_total", "outcome" => outcome.label()).increment(1);
        match outcome {
            Outcome::Published => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
            },
            Outcome::Failed => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            },
            Outcome::Poison => {
                self.stats.poison.fetch_add(1, Ordering::Relaxed);
            },
            Outcome::Unpublished => return false,
        }

        self.set_state(WorkerState::Acking);
        match self
            .stream
            .ack(&self.settings.input_stream, &self.settings.group, &message.id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to acknowledge message");
                false
            },
        }
    }

    async fn enrich_and_publish(&self, request: &EnrichRequest) -> Outcome {
        let result = self.enricher.enrich(request).await;
        let payload = match serde_json::to_string(&result) {
            Ok(payload) => payload,
            Err(e) => {
                error!(request_id = %request.id, error = %e, "Failed to serialize result");
                return Outcome::Unpublished;
            },
        };

        match self
            .stream
            .publish(&self.settings.result_stream, &payload)
            .await
        {
            Ok(result_id) => {
                debug!(request_id = %request.id, result_id = %result_id, "Published result");
                if result.is_success() {
                    Outcome::Published
                } else {
                    Outcome::Failed
                }
            },
            Err(e) => {
                error!(
                    request_id = %request.id,
                    error = %e,
                    "Failed to publish result, leaving message pending"
                );
                Outcome::Unpublished
            },
        }
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<(), WorkerError> {
        if !self.ensure_group(cancel).await? {
            return Ok(());
        }
        info!(
            worker = %self.name,
            stream = %self.settings.input_stream,
            group = %self.settings.group,
            "Stream worker started"
        );

        let mut cursor = ReadCursor::pending();
        loop {
            if cancel.is_cancelled() || self.stop.is_cancelled() {
                return Ok(());
            }

            self.set_state(WorkerState::Reading);
            let read = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = self.stop.cancelled() => return Ok(()),
                read = self.stream.read_group(
                    &self.settings.input_stream,
                    &self.settings.group,
                    &self.settings.consumer,
                    cursor.start_id(),
                    self.settings.read_count,
                    self.settings.block_ms,
                ) => read,
            };

            let messages = match read {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(worker = %self.name, error = %e, "Stream read failed, backing off");
                    self.set_state(WorkerState::Idle);
                    cursor.restart_pending();
                    if !self.backoff(cancel).await {
                        return Ok(());
                    }
                    continue;
                },
            };

            if cursor.is_pending() {
                let Some(last) = messages.last() else {
                    self.set_state(WorkerState::Idle);
                    if cursor.finish_pass() {
                        cursor.restart_pending();
                        if !self.backoff(cancel).await {
                            return Ok(());
                        }
                    }
                    continue;
                };
                debug!(
                    worker = %self.name,
                    count = messages.len(),
                    "Re-reading pending messages"
                );
                cursor.advance(&last.id);
            }

            let mut unacked = 0usize;
            for message in &messages {
                if !self.handle(message).await {
                    unacked += 1;
                }
            }
            self.set_state(WorkerState::Idle);

            if unacked > 0 {
                if cursor.is_pending() {
                    cursor.retry = true;
                } else {
                    warn!(
                        worker = %self.name,
                        unacked,
                        "Messages left pending, retrying after backoff"
                    );
                    cursor.restart_pending();
                    if !self.backoff(cancel).await {
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn parse_request(message: &StreamMessage) -> Result<EnrichRequest, ApplicationError> {
    let payload = message.payload.as_deref().ok_or_else(|| {
        ApplicationError::PoisonMessage(format!("message {} has no payload field", message.id))
    })?;
    serde_json::from_str(payload).map_err(|e| ApplicationError::PoisonMessage(e.to_string()))
}

#[async_trait]
impl Worker for StreamWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, cancel: CancellationToken) -> Result<(), WorkerError> {
        let result = self.run(&cancel).await;
        self.set_state(WorkerState::Stopped);
        info!(worker = %self.name, stats = ?self.stats.snapshot(), "Stream worker stopped");
        result
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::test_support::{FakeEnricher, FakeStream};
    use domain::EnrichResult;

    fn decode_result(payload: &str) -> serde_json::Result<EnrichResult> {
        serde_json::from_str(payload)
    }

    fn worker(stream: &Arc<FakeStream>) -> StreamWorker {
        StreamWorker::new(
            Arc::clone(stream) as Arc<dyn EventStreamPort>,
            Arc::new(FakeEnricher),
            StreamWorkerSettings::for_testing("enricher-0"),
        )
    }

    #[test]
    fn settings_from_config() {
        let config = StreamConfig::default();
        let settings = StreamWorkerSettings::from_config(&config, 3);
        assert_eq!(settings.consumer, "enricher-3");
        assert_eq!(settings.input_stream, config.input_stream);
        assert_eq!(settings.block_ms, config.block_ms);
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            WorkerState::Idle,
            WorkerState::Reading,
            WorkerState::Processing,
            WorkerState::Acking,
            WorkerState::Stopped,
        ] {
            assert_eq!(WorkerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn missing_payload_is_poison() {
        let message = StreamMessage {
            id: "1-0".to_string(),
            payload: None,
        };
        assert!(matches!(
            parse_request(&message),
            Err(ApplicationError::PoisonMessage(_))
        ));
    }

    #[tokio::test]
    async fn publishes_result_then_acks() {
        let stream = Arc::new(FakeStream::default());
        let worker = worker(&stream);
        let message = StreamMessage::new("1-0", r#"{"id":"a","country":"Spain"}"#);

        assert!(worker.handle(&message).await);

        let published = stream.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "results");
        let result = decode_result(&published[0].1).unwrap();
        assert_eq!(result.id, "a");
        assert!(result.is_success());
        assert_eq!(stream.acked(), vec!["1-0".to_string()]);
        assert_eq!(worker.stats().snapshot().processed, 1);
    }

    #[tokio::test]
    async fn enrichment_error_is_published_and_acked() {
        let stream = Arc::new(FakeStream::default());
        let worker = worker(&stream);
        let message = StreamMessage::new("2-0", r#"{"id":"b","country":"Atlantis"}"#);

        assert!(worker.handle(&message).await);

        let result = decode_result(&stream.published()[0].1).unwrap();
        assert_eq!(result.error.as_deref(), Some("location not found"));
        assert_eq!(stream.acked().len(), 1);
        let stats = worker.stats().snapshot();
        assert_eq!((stats.processed, stats.failed), (1, 1));
    }

    #[tokio::test]
    async fn poison_message_is_acked_without_publishing() {
        let stream = Arc::new(FakeStream::default());
        let worker = worker(&stream);
        let message = StreamMessage::new("3-0", "not json");

        assert!(worker.handle(&message).await);

        assert!(stream.published().is_empty());
        assert_eq!(stream.acked(), vec!["3-0".to_string()]);
        assert_eq!(worker.stats().snapshot().poison, 1);
    }

    #[tokio::test]
    async fn publish_failure_leaves_message_pending() {
        let stream = Arc::new(FakeStream::default().failing_publish());
        let worker = worker(&stream);
        let message = StreamMessage::new("4-0", r#"{"id":"c","country":"Spain"}"#);

        assert!(!worker.handle(&message).await);

        assert!(stream.acked().is_empty());
        assert_eq!(worker.stats().snapshot(), WorkerStatsSnapshot::default());
    }

    #[tokio::test]
    async fn run_consumes_queue_until_cancelled() {
        let stream = Arc::new(FakeStream::default());
        stream.push(StreamMessage::new("1-0", r#"{"id":"a","country":"Spain"}"#));
        stream.push(StreamMessage::new("2-0", "{}"));
        let worker = Arc::new(worker(&stream));
        let cancel = CancellationToken::new();

        let handle = {
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.start(cancel).await })
        };

        for _ in 0..100 {
            if stream.acked().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(stream.groups(), 1);
        assert_eq!(stream.acked().len(), 2);
        assert_eq!(worker.state(), WorkerState::Stopped);
        let stats = worker.stats().snapshot();
        assert_eq!((stats.processed, stats.poison), (1, 1));
    }

    #[tokio::test]
    async fn stop_ends_the_loop() {
        let stream = Arc::new(FakeStream::default());
        let worker = Arc::new(worker(&stream));

        let handle = {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.start(CancellationToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        worker.stop();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn read_errors_back_off_and_retry() {
        let stream = Arc::new(FakeStream::default().failing_reads(2));
        stream.push(StreamMessage::new("1-0", r#"{"id":"a","country":"Spain"}"#));
        let worker = Arc::new(worker(&stream));
        let cancel = CancellationToken::new();

        let handle = {
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.start(cancel).await })
        };
        for _ in 0..100 {
            if !stream.acked().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(stream.acked(), vec!["1-0".to_string()]);
    }

    #[tokio::test]
    async fn fatal_group_error_ends_worker() {
        let stream = Arc::new(FakeStream::default().failing_group());
        let worker = worker(&stream);

        let result = worker.start(CancellationToken::new()).await;

        assert!(matches!(result, Err(WorkerError::Stream(_))));
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn cursor_walks_pending_list_then_returns_to_new_messages() {
        let mut cursor = ReadCursor::pending();
        assert_eq!(cursor.start_id(), PENDING_MESSAGES);

        cursor.advance("5-0");
        assert_eq!(cursor.start_id(), "5-0");
        cursor.retry = true;

        assert!(cursor.finish_pass());
        assert_eq!(cursor.start_id(), NEW_MESSAGES);
        assert!(!cursor.finish_pass());

        cursor.restart_pending();
        assert!(cursor.is_pending());
        assert!(!cursor.retry);
    }

    async fn run_until_acked(stream: &Arc<FakeStream>, expected: usize) -> Arc<StreamWorker> {
        let worker = Arc::new(worker(stream));
        let cancel = CancellationToken::new();
        let handle = {
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.start(cancel).await })
        };
        for _ in 0..200 {
            if stream.acked().len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();
        worker
    }

    #[tokio::test]
    async fn unpublished_message_is_redelivered_and_acked() {
        let stream = Arc::new(FakeStream::default().failing_publishes(1));
        stream.push(StreamMessage::new("1-0", r#"{"id":"a","country":"Spain"}"#));

        let worker = run_until_acked(&stream, 1).await;

        assert_eq!(stream.acked(), vec!["1-0".to_string()]);
        assert_eq!(stream.published().len(), 1);
        assert!(stream.pending_ids().is_empty());
        let reads = stream.reads();
        let first_new = reads.iter().position(|id| id == NEW_MESSAGES).unwrap();
        assert!(reads[first_new..].iter().any(|id| id == PENDING_MESSAGES));
        assert_eq!(worker.stats().snapshot().processed, 1);
    }

    #[tokio::test]
    async fn pending_messages_are_processed_before_new_ones() {
        let stream = Arc::new(FakeStream::default());
        stream.push_pending(StreamMessage::new("1-0", r#"{"id":"old","country":"Spain"}"#));
        stream.push(StreamMessage::new("2-0", r#"{"id":"new","country":"Spain"}"#));

        run_until_acked(&stream, 2).await;

        assert_eq!(stream.reads()[0], PENDING_MESSAGES);
        assert_eq!(stream.acked(), vec!["1-0".to_string(), "2-0".to_string()]);
        let first = decode_result(&stream.published()[0].1).unwrap();
        assert_eq!(first.id, "old");
    }

    #[tokio::test]
    async fn failed_pending_message_does_not_stall_the_pass() {
        let stream = Arc::new(FakeStream::default().failing_publishes(1));
        stream.push_pending(StreamMessage::new("1-0", r#"{"id":"a","country":"Spain"}"#));
        stream.push_pending(StreamMessage::new("2-0", r#"{"id":"b","country":"Spain"}"#));

        run_until_acked(&stream, 2).await;

        assert_eq!(stream.acked(), vec!["2-0".to_string(), "1-0".to_string()]);
        assert!(stream.pending_ids().is_empty());
    }
}
