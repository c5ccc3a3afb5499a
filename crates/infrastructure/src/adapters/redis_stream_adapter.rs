//! Redis stream adapter - Implements `EventStreamPort` over Redis streams
//!
//! Uses `XGROUP CREATE ... MKSTREAM`, `XREADGROUP`, `XADD` and `XACK`.
//! `XREADGROUP` blocks only for new messages; reads of the pending list
//! return immediately. Each worker should own its adapter so a blocking read holds only
//! that worker's connection.

use application::error::ApplicationError;
use application::ports::{DATA_FIELD, EventStreamPort, NEW_MESSAGES, StreamMessage};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisError};
use tracing::{debug, info, instrument};

/// Event stream adapter backed by Redis
#[derive(Clone)]
pub struct RedisStreamAdapter {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamAdapter").finish_non_exhaustive()
    }
}

impl RedisStreamAdapter {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a malformed URL and `UpstreamUnavailable`
    /// if the connection cannot be established.
    #[instrument(skip_all)]
    pub async fn connect(url: &str) -> Result<Self, ApplicationError> {
        let client = redis::Client::open(url)
            .map_err(|e| ApplicationError::Configuration(format!("Invalid Redis URL: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(map_redis_error)?;
        info!("Connected to Redis");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager
    #[must_use]
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventStreamPort for RedisStreamAdapter {
    #[instrument(skip(self))]
    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        match conn
            .xgroup_create_mkstream::<_, _, _, ()>(stream, group, "$")
            .await
        {
            Ok(()) => {
                info!("Consumer group created");
                Ok(())
            },
            Err(e) if is_busy_group(&e) => {
                debug!("Consumer group already exists");
                Ok(())
            },
            Err(e) => Err(map_redis_error(e)),
        }
    }

    #[instrument(skip(self), level = "trace")]
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        start_id: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamMessage>, ApplicationError> {
        let options = read_options(group, consumer, start_id, count, block_ms);

        let mut conn = self.conn.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[stream], &[start_id], &options)
            .await
            .map_err(map_redis_error)?;

        Ok(reply.map(messages_from_reply).unwrap_or_default())
    }

    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(&self, stream: &str, payload: &str) -> Result<String, ApplicationError> {
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd(stream, "*", &[(DATA_FIELD, payload)])
            .await
            .map_err(map_redis_error)?;
        debug!(message_id = %id, "Published");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        let acked: i64 = conn
            .xack(stream, group, &[id])
            .await
            .map_err(map_redis_error)?;
        if acked == 0 {
            debug!("Message was not pending");
        }
        Ok(())
    }
}

fn read_options(
    group: &str,
    consumer: &str,
    start_id: &str,
    count: usize,
    block_ms: u64,
) -> StreamReadOptions {
    let options = StreamReadOptions::default()
        .group(group, consumer)
        .count(count);
    if start_id == NEW_MESSAGES {
        options.block(usize::try_from(block_ms).unwrap_or(usize::MAX))
    } else {
        options
    }
}

/// Flatten a read reply into messages, reading the `data` field
fn messages_from_reply(reply: StreamReadReply) -> Vec<StreamMessage> {
    reply
        .keys
        .into_iter()
        .flat_map(|key| key.ids)
        .map(|entry| StreamMessage {
            payload: entry.get::<String>(DATA_FIELD),
            id: entry.id,
        })
        .collect()
}

fn is_busy_group(e: &RedisError) -> bool {
    e.code() == Some("BUSYGROUP") || e.to_string().contains("BUSYGROUP")
}

fn map_redis_error(e: RedisError) -> ApplicationError {
    ApplicationError::UpstreamUnavailable(format!("Redis error: {e}"))
}
