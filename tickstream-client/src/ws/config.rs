//! WebSocket client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tickstream_core::config::FeedSettings;

/// Configuration for the WebSocket client.
///
/// The reconnect policy is a fixed delay: no jitter, no backoff, no attempt
/// cap. A single timer may be pending per connection at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// WebSocket endpoint URL.
    pub url: String,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whether automatic reconnection is enabled.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Fixed reconnection delay in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Outbound queue capacity.
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_send_queue_capacity() -> usize {
    100
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            send_queue_capacity: default_send_queue_capacity(),
        }
    }
}

impl WsConfig {
    /// Creates a new builder for `WsConfig`.
    #[must_use]
    pub fn builder() -> WsConfigBuilder {
        WsConfigBuilder::default()
    }

    /// Builds a config from feed settings (endpoint chosen once, here).
    #[must_use]
    pub fn from_settings(settings: &FeedSettings) -> Self {
        Self {
            url: settings.ws_url(),
            connect_timeout_ms: settings.connect_timeout_ms,
            auto_reconnect: settings.auto_reconnect,
            reconnect_delay_ms: settings.reconnect_delay_ms,
            send_queue_capacity: default_send_queue_capacity(),
        }
    }

    /// Returns the connection timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the reconnect delay as a `Duration`.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Builder for [`WsConfig`].
#[derive(Debug, Default)]
pub struct WsConfigBuilder {
    url: Option<String>,
    connect_timeout_ms: Option<u64>,
    auto_reconnect: Option<bool>,
    reconnect_delay_ms: Option<u64>,
    send_queue_capacity: Option<usize>,
}

impl WsConfigBuilder {
    /// Sets the WebSocket URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets whether automatic reconnection is enabled.
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = Some(enabled);
        self
    }

    /// Sets the fixed reconnection delay.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the outbound queue capacity.
    #[must_use]
    pub fn send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = Some(capacity);
        self
    }

    /// Builds the `WsConfig`.
    #[must_use]
    pub fn build(self) -> WsConfig {
        WsConfig {
            url: self.url.unwrap_or_default(),
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            auto_reconnect: self.auto_reconnect.unwrap_or_else(default_auto_reconnect),
            reconnect_delay_ms: self
                .reconnect_delay_ms
                .unwrap_or_else(default_reconnect_delay_ms),
            send_queue_capacity: self
                .send_queue_capacity
                .unwrap_or_else(default_send_queue_capacity),
        }
    }
}
