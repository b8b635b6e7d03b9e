//! Feed settings and endpoint selection.
//!
//! The deployment environment is an explicit configuration value chosen once
//! at construction; there is no hidden global lookup and the endpoint is not
//! re-evaluated afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed development endpoint (local backend).
pub const DEV_ENDPOINT: &str = "ws://localhost:8000/ws";

/// Deployment environment for endpoint selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: fixed localhost endpoint.
    #[default]
    Development,
    /// Production: endpoint derived from the serving host.
    Production,
}

/// Settings for the dashboard telemetry feed.
///
/// # Examples
///
/// ```
/// use tickstream_core::config::{Environment, FeedSettings};
///
/// let settings = FeedSettings {
///     environment: Environment::Production,
///     host: "bot.example.com".to_string(),
///     ..FeedSettings::default()
/// };
/// assert_eq!(settings.ws_url(), "ws://bot.example.com/ws");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Serving host, used to derive the production endpoint.
    #[serde(default)]
    pub host: String,

    /// Whether automatic reconnection is enabled.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Fixed delay before a reconnection attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: String::new(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl FeedSettings {
    /// Returns the WebSocket endpoint for the configured environment.
    #[must_use]
    pub fn ws_url(&self) -> String {
        match self.environment {
            Environment::Development => DEV_ENDPOINT.to_string(),
            Environment::Production => format!("ws://{}/ws", self.host),
        }
    }

    /// Returns the reconnect delay as a `Duration`.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the connection timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
