//! # Tickstream Client
//!
//! Real-time telemetry client for the trading bot dashboard.
//!
//! This crate provides:
//! - A reconnecting WebSocket client with a fixed-delay reconnect scheduler
//!   and a reactive heartbeat responder (`ws`)
//! - A typed subscriber layer that projects inbound envelopes onto
//!   externally-owned state slots (`feed`)
//!
//! # Example
//!
//! ```ignore
//! use tickstream_client::feed::FeedHandle;
//! use tickstream_core::config::FeedSettings;
//!
//! let feed = FeedHandle::new(&FeedSettings::default());
//! feed.connect().await?;
//!
//! if let Some(price) = feed.slots().price.get() {
//!     println!("{}: {}", price.symbol, price.price);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// WebSocket client infrastructure
pub mod ws;

/// Typed subscriber layer and state slots
pub mod feed;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::feed::{FeedHandle, FeedSlots, Slot, TradingFeed};
    pub use crate::ws::{ConnectionState, Envelope, FeedCallback, WsClient, WsConfig};
    pub use tickstream_core::prelude::*;
}
