//! Configuration management for the Crop Advisor backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with CROP__ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Climate data API configuration
    pub climate: ClimateConfig,

    /// Plant identification API configuration
    pub identification: IdentificationConfig,

    /// Recommendation session configuration
    pub session: SessionConfig,

    /// Crop knowledge base configuration
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClimateConfig {
    /// Climate API endpoint
    pub api_endpoint: String,

    /// Climate API key
    pub api_key: String,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// How long a cached snapshot stays fresh
    pub cache_freshness_secs: u64,

    /// Upstream attempts before giving up
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled after each failure
    pub initial_backoff_ms: u64,

    /// Upper bound for the doubled delay
    pub max_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentificationConfig {
    /// Plant identification API endpoint
    pub api_endpoint: String,

    /// Plant identification API key
    pub api_key: String,

    /// Identification is optional, so this is kept short
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// How long `run` waits for both inputs before proceeding
    pub input_wait_secs: u64,

    /// Number of recommendations shown by default
    pub top_n: usize,

    /// Sessions older than this are discarded by the background sweep
    pub max_age_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// Knowledge base JSON file; the bundled catalog is used when unset
    pub path: Option<String>,
}

/// Bounded exponential backoff for upstream calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to sleep after failed attempt number `attempt` (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(4000),
        }
    }
}

impl ClimateConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn cache_freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_freshness_secs as i64)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("CROP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("climate.api_endpoint", "http://localhost:8081/v1")?
            .set_default("climate.api_key", "")?
            .set_default("climate.request_timeout_secs", 10)?
            .set_default("climate.cache_freshness_secs", 3 * 60 * 60)?
            .set_default("climate.max_attempts", 3)?
            .set_default("climate.initial_backoff_ms", 1000)?
            .set_default("climate.max_backoff_ms", 4000)?
            .set_default("identification.api_endpoint", "http://localhost:8082/v1")?
            .set_default("identification.api_key", "")?
            .set_default("identification.timeout_secs", 5)?
            .set_default("session.input_wait_secs", 30)?
            .set_default("session.top_n", 3)?
            .set_default("session.max_age_secs", 60 * 60)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CROP__ prefix)
            .add_source(
                Environment::with_prefix("CROP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
