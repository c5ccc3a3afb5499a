//! Redis stream configuration.

use serde::{Deserialize, Serialize};

/// Stream consumption settings shared by every worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Stream carrying enrichment requests
    #[serde(default = "default_input_stream")]
    pub input_stream: String,

    /// Stream receiving enrichment results
    #[serde(default = "default_result_stream")]
    pub result_stream: String,

    /// Consumer group name
    #[serde(default = "default_group")]
    pub group: String,

    /// Consumer name prefix; workers are named `{prefix}-{n}`
    #[serde(default = "default_consumer_prefix")]
    pub consumer_prefix: String,

    /// Number of stream workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Messages fetched per read
    #[serde(default = "default_read_count")]
    pub read_count: usize,

    /// Maximum blocking time of a read in milliseconds
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Pause after a failed read in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_input_stream() -> String {
    "location:enrich:requests".to_string()
}

fn default_result_stream() -> String {
    "location:enrich:results".to_string()
}

fn default_group() -> String {
    "location-enricher".to_string()
}

fn default_consumer_prefix() -> String {
    "enricher".to_string()
}

const fn default_worker_count() -> usize {
    2
}

const fn default_read_count() -> usize {
    10
}

const fn default_block_ms() -> u64 {
    5000
}

const fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            input_stream: default_input_stream(),
            result_stream: default_result_stream(),
            group: default_group(),
            consumer_prefix: default_consumer_prefix(),
            worker_count: default_worker_count(),
            read_count: default_read_count(),
            block_ms: default_block_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl StreamConfig {
    /// Consumer name of the `n`-th worker
    #[must_use]
    pub fn consumer_name(&self, n: usize) -> String {
        format!("{}-{n}", self.consumer_prefix)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err("redis_url must start with redis:// or rediss://".to_string());
        }
        for (field, value) in [
            ("input_stream", &self.input_stream),
            ("result_stream", &self.result_stream),
            ("group", &self.group),
            ("consumer_prefix", &self.consumer_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        if self.input_stream == self.result_stream {
            return Err("input_stream and result_stream must differ".to_string());
        }
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".to_string());
        }
        if self.read_count == 0 {
            return Err("read_count must be greater than 0".to_string());
        }
        if self.block_ms == 0 {
            return Err("block_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}
