//! Durable event stream port
//!
//! Consumer-group reads with per-message acknowledgment. Messages carry one
//! JSON payload in the [`DATA_FIELD`] field.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Name of the field carrying the JSON payload
pub const DATA_FIELD: &str = "data";

/// Read position for messages never delivered to the group
pub const NEW_MESSAGES: &str = ">";

/// Read position for the start of a consumer's pending (delivered, unacknowledged) list
pub const PENDING_MESSAGES: &str = "0";

/// A message read from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Stream-assigned id, used only for acknowledgment
    pub id: String,
    /// Content of the `data` field, `None` if the field is missing
    pub payload: Option<String>,
}

impl StreamMessage {
    /// Create a message with a payload
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: Some(payload.into()),
        }
    }
}

/// Port for stream consumption and publication
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventStreamPort: Send + Sync {
    /// Create the consumer group (and the stream) if it does not exist yet
    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), ApplicationError>;

    /// Read up to `count` messages for `consumer`
    ///
    /// With [`NEW_MESSAGES`] as `start_id` the read returns undelivered
    /// messages, blocking at most `block_ms`, and an empty vector when the
    /// block time elapses. Any other `start_id` returns this consumer's
    /// pending messages with an id greater than `start_id` without blocking.
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        start_id: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamMessage>, ApplicationError>;

    /// Append a payload to a stream, returning the new message id
    async fn publish(&self, stream: &str, payload: &str) -> Result<String, ApplicationError>;

    /// Acknowledge a message for the group
    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), ApplicationError>;
}
