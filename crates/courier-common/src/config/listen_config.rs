//! Listener configuration
//!
//! Loads configuration from environment variables with per-field defaults.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Configuration for the listen pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Base domain of the chat edge hosts
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Number of numbered edge shards the long-poll channel cycles through
    #[serde(default = "default_pull_shards")]
    pub pull_shards: u8,

    /// Upper bound on a single blocking read; the server holds long-poll
    /// requests open for ~50 s, so this must be comfortably above that
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Bound on connection establishment
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Sleep after a connection reset before retrying
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Buffer size of the emitted event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Whether the liveness ping starts enabled
    #[serde(default = "default_keepalive")]
    pub keepalive: bool,
}

impl ListenConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set but does not parse, or if a
    /// parsed value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            domain: env::var("COURIER_DOMAIN").unwrap_or_else(|_| default_domain()),
            pull_shards: parse_var("COURIER_PULL_SHARDS", default_pull_shards())?,
            read_timeout_secs: parse_var("COURIER_READ_TIMEOUT_SECS", default_read_timeout_secs())?,
            connect_timeout_secs: parse_var(
                "COURIER_CONNECT_TIMEOUT_SECS",
                default_connect_timeout_secs(),
            )?,
            cooldown_secs: parse_var("COURIER_COOLDOWN_SECS", default_cooldown_secs())?,
            event_buffer: parse_var("COURIER_EVENT_BUFFER", default_event_buffer())?,
            keepalive: parse_var("COURIER_KEEPALIVE", default_keepalive())?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that defaults alone cannot guarantee
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pull_shards == 0 {
            return Err(ConfigError::InvalidValue(
                "COURIER_PULL_SHARDS",
                "must be at least 1".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "COURIER_EVENT_BUFFER",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Bound on a single blocking read
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Bound on connection establishment
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Sleep applied after a connection reset
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            pull_shards: default_pull_shards(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            cooldown_secs: default_cooldown_secs(),
            event_buffer: default_event_buffer(),
            keepalive: default_keepalive(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default),
    }
}

// Default value functions
fn default_domain() -> String {
    "edge-chat.facebook.com".to_string()
}

fn default_pull_shards() -> u8 {
    5
}

fn default_read_timeout_secs() -> u64 {
    60 // the server holds long-poll requests for ~50s
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_event_buffer() -> usize {
    100
}

fn default_keepalive() -> bool {
    true
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
