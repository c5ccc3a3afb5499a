//! Routing service configuration

use serde::{Deserialize, Serialize};

/// Configuration for the routing-matrix service
#[derive(Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Base URL of the Matrix API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Routing profile, e.g. `mapbox/walking`
    #[serde(default = "default_profile")]
    pub profile: String,

    /// API access token, sent as the `access_token` query parameter
    #[serde(default)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum coordinates (origins + destinations) per request
    #[serde(default = "default_max_coordinates")]
    pub max_coordinates: usize,
}

fn default_base_url() -> String {
    "https://api.mapbox.com".to_string()
}

fn default_profile() -> String {
    "mapbox/walking".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_coordinates() -> usize {
    25
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            profile: default_profile(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
            max_coordinates: default_max_coordinates(),
        }
    }
}

impl std::fmt::Debug for RoutingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingConfig")
            .field("base_url", &self.base_url)
            .field("profile", &self.profile)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("max_coordinates", &self.max_coordinates)
            .finish()
    }
}

impl RoutingConfig {
    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            access_token: Some("test-token".to_string()),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("base_url must start with http:// or https://".to_string());
        }
        if self.profile.trim().is_empty() {
            return Err("profile must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_coordinates < 2 {
            return Err("max_coordinates must be at least 2".to_string());
        }
        Ok(())
    }
}
