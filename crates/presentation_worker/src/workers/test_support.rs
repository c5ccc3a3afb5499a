//! In-memory stream and enricher fakes for worker tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use application::ApplicationError;
use application::ports::{EventStreamPort, LocationEnricher, NEW_MESSAGES, StreamMessage};
use async_trait::async_trait;
use domain::{EnrichRequest, EnrichResult, EnrichedLocation};
use parking_lot::Mutex;

/// Single-consumer stream: new messages, the pending list, and everything
/// published and acked
#[derive(Debug, Default)]
pub struct FakeStream {
    queue: Mutex<VecDeque<StreamMessage>>,
    pending: Mutex<Vec<StreamMessage>>,
    published: Mutex<Vec<(String, String)>>,
    acked: Mutex<Vec<String>>,
    reads: Mutex<Vec<String>>,
    groups: AtomicUsize,
    read_failures: AtomicUsize,
    publish_failures: AtomicUsize,
    fail_group: bool,
}

/// Order stream ids as `millis-seq`; a bare `0` sorts first
fn id_key(id: &str) -> (u64, u64) {
    let (ms, seq) = id.split_once('-').unwrap_or((id, "0"));
    (ms.parse().unwrap_or(0), seq.parse().unwrap_or(0))
}

impl FakeStream {
    pub fn failing_publish(self) -> Self {
        self.failing_publishes(usize::MAX)
    }

    pub fn failing_publishes(self, count: usize) -> Self {
        self.publish_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn failing_group(mut self) -> Self {
        self.fail_group = true;
        self
    }

    pub fn failing_reads(self, count: usize) -> Self {
        self.read_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn push(&self, message: StreamMessage) {
        self.queue.lock().push_back(message);
    }

    /// Put a message straight into the pending list, as if delivered before a crash
    pub fn push_pending(&self, message: StreamMessage) {
        self.pending.lock().push(message);
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().clone()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.lock().iter().map(|m| m.id.clone()).collect()
    }

    /// Start ids of every successful read, in order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }

    pub fn groups(&self) -> usize {
        self.groups.load(Ordering::SeqCst)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl EventStreamPort for FakeStream {
    async fn ensure_group(&self, _stream: &str, _group: &str) -> Result<(), ApplicationError> {
        if self.fail_group {
            return Err(ApplicationError::Configuration("WRONGTYPE".to_string()));
        }
        self.groups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_group(
        &self,
        _stream: &str,
        _group: &str,
        _consumer: &str,
        start_id: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamMessage>, ApplicationError> {
        if take_one(&self.read_failures) {
            return Err(ApplicationError::UpstreamUnavailable(
                "connection reset".to_string(),
            ));
        }
        self.reads.lock().push(start_id.to_string());

        if start_id != NEW_MESSAGES {
            let after = id_key(start_id);
            return Ok(self
                .pending
                .lock()
                .iter()
                .filter(|m| id_key(&m.id) > after)
                .take(count)
                .cloned()
                .collect());
        }

        let batch: Vec<StreamMessage> = {
            let mut queue = self.queue.lock();
            let take = count.min(queue.len());
            queue.drain(..take).collect()
        };
        if batch.is_empty() {
            tokio::time::sleep(Duration::from_millis(block_ms)).await;
        }
        self.pending.lock().extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn publish(&self, stream: &str, payload: &str) -> Result<String, ApplicationError> {
        if take_one(&self.publish_failures) {
            return Err(ApplicationError::UpstreamUnavailable("broken pipe".to_string()));
        }
        let mut published = self.published.lock();
        published.push((stream.to_string(), payload.to_string()));
        Ok(format!("{}-0", published.len()))
    }

    async fn ack(&self, _stream: &str, _group: &str, id: &str) -> Result<(), ApplicationError> {
        self.pending.lock().retain(|m| m.id != id);
        self.acked.lock().push(id.to_string());
        Ok(())
    }
}

/// Enricher that only knows Spain
#[derive(Debug)]
pub struct FakeEnricher;

#[async_trait]
impl LocationEnricher for FakeEnricher {
    async fn enrich(&self, request: &EnrichRequest) -> EnrichResult {
        if request.country == "Spain" {
            EnrichResult::success(&request.id, EnrichedLocation::default(), None)
        } else {
            EnrichResult::failure(&request.id, "location not found")
        }
    }
}
