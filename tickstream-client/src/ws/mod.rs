//! WebSocket client infrastructure.
//!
//! This module provides the resilient transport underneath the dashboard
//! feed:
//! - Connection state machine with an exclusively-owned transport handle
//! - Fixed-delay reconnect scheduler (single pending timer per connection)
//! - Envelope dispatcher with a reactive heartbeat responder
//!
//! # Example
//!
//! ```ignore
//! use tickstream_client::ws::{WsClient, WsConfig, FeedCallback};
//!
//! let config = WsConfig::builder()
//!     .url("ws://localhost:8000/ws")
//!     .auto_reconnect(true)
//!     .build();
//!
//! let client = WsClient::new(config);
//! client.set_callback(MyCallback);
//! client.connect().await?;
//! ```

mod client;
mod config;
mod envelope;
mod state;

pub use client::{FeedCallback, WsClient};
pub use config::{WsConfig, WsConfigBuilder};
pub use envelope::{tags, Envelope, PONG_REPLY};
pub use state::ConnectionState;
