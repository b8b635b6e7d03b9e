//! # Tickstream Core
//!
//! Shared types for the tickstream dashboard telemetry feed.
//!
//! This crate provides:
//! - Wire payload structures pushed by the bot backend (`PriceUpdate`,
//!   `OrderbookUpdate`, `TradeExecuted`, `SystemStatus`)
//! - Transport error types
//! - Feed settings with explicit environment-based endpoint selection

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// Wire payload structures
pub mod data;

/// Transport error types
pub mod error;

/// Feed settings and endpoint selection
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Environment, FeedSettings};
    pub use crate::data::{BotMode, OrderbookUpdate, PriceUpdate, Side, SystemStatus, TradeExecuted};
    pub use crate::error::TransportError;
}
