//! Application configuration
//!
//! Split into focused sub-modules:
//! - `stream`: Redis stream names, consumer group, worker count
//! - `database`: PostGIS connection pool
//! - `resilience`: circuit breaker thresholds, logging
//!
//! The transport search, routing scheduler and routing client sections reuse
//! the configuration types of the crates that own them.

mod database;
mod resilience;
mod stream;

use std::path::Path;
use std::time::Duration;

use application::{RoutingSchedulerConfig, TransportSearchConfig};
use integration_routing::RoutingConfig;
use serde::{Deserialize, Serialize};

pub use database::DatabaseConfig;
pub use resilience::{LogFormat, ResilienceConfig, TelemetryAppConfig};
pub use stream::StreamConfig;

/// Prefix of configuration environment variables, e.g. `ENRICHER_STREAM__REDIS_URL`
pub const ENV_PREFIX: &str = "ENRICHER";

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn prefixed(section: &'static str) -> impl Fn(String) -> String {
    move |e| format!("{section}: {e}")
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Stream consumption
    #[serde(default)]
    pub stream: StreamConfig,

    /// PostGIS connection pool
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Nearby transport search defaults
    #[serde(default)]
    pub transport: TransportSearchConfig,

    /// Routing batch scheduler
    #[serde(default)]
    pub scheduler: RoutingSchedulerConfig,

    /// Routing-matrix API client
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Circuit breaker settings
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryAppConfig,

    /// Seconds to wait for workers to finish on shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            database: DatabaseConfig::default(),
            transport: TransportSearchConfig::default(),
            scheduler: RoutingSchedulerConfig::default(),
            routing: RoutingConfig::default(),
            resilience: ResilienceConfig::default(),
            telemetry: TelemetryAppConfig::default(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or deserialized.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// Load configuration from the given file (extension optional, file may be
    /// missing), overridden by `ENRICHER_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or deserialized.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (e.g., ENRICHER_STREAM__WORKER_COUNT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Shutdown grace period
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first failing section and its message.
    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate().map_err(prefixed("stream"))?;
        self.database.validate().map_err(prefixed("database"))?;
        self.transport.validate().map_err(prefixed("transport"))?;
        self.scheduler.validate().map_err(prefixed("scheduler"))?;
        self.resilience.validate().map_err(prefixed("resilience"))?;
        self.telemetry.validate().map_err(prefixed("telemetry"))?;

        if self.scheduler.enabled {
            self.routing.validate().map_err(prefixed("routing"))?;
            if self.scheduler.max_coordinates > self.routing.max_coordinates {
                return Err(format!(
                    "scheduler: max_coordinates ({}) exceeds routing.max_coordinates ({})",
                    self.scheduler.max_coordinates, self.routing.max_coordinates
                ));
            }
        }

        if self.shutdown_timeout_secs == 0 {
            return Err("shutdown_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
