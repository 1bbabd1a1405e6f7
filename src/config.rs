//! Client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Anything unset falls back to the
//! defaults the canvas front end has always used.

use std::time::Duration;

use crate::error::ClientError;

/// Default canvas endpoint.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8000/ws/canvas";

/// Fixed delay between automatic reconnection attempts, in milliseconds.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Fixed delay between automatic reconnection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration =
    Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS);

/// Maximum automatic reconnection attempts between successful opens.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Top-level client configuration.
///
/// Loaded once at startup via [`ClientConfig::from_env`], or built in code
/// with [`ClientConfig::new`] and the `with_*` setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket URL of the canvas endpoint (`ws://` or `wss://`).
    pub url: String,

    /// Delay before each automatic reconnection attempt.
    pub reconnect_interval: Duration,

    /// Number of automatic reconnects allowed before giving up.
    pub max_reconnect_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `url` with default reconnect settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Overrides the reconnect interval.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Overrides the reconnect attempt budget.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if `PIXEL_WS_URL` is set to
    /// something that is not a `ws://` or `wss://` URL.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let url = std::env::var("PIXEL_WS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let reconnect_interval = Duration::from_millis(parse_env(
            "RECONNECT_INTERVAL_MS",
            DEFAULT_RECONNECT_INTERVAL_MS,
        ));
        let max_reconnect_attempts =
            parse_env("MAX_RECONNECT_ATTEMPTS", DEFAULT_MAX_RECONNECT_ATTEMPTS);

        let config = Self {
            url,
            reconnect_interval,
            max_reconnect_attempts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the URL is non-empty and uses a WebSocket scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<(), ClientError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ClientError::InvalidConfig(
                "PIXEL_WS_URL is empty".to_string(),
            ));
        }
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ClientError::InvalidConfig(format!(
                "PIXEL_WS_URL must start with ws:// or wss://, got {url}"
            )));
        }
        Ok(())
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
