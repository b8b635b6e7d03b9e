//! Wire payload structures pushed by the bot backend.
//!
//! These mirror the `data` field of the inbound envelope for each recognized
//! message type. All of them are display-oriented snapshots: the dashboard
//! always replaces the previous value with the latest one (last-write-wins),
//! so no arithmetic precision beyond `f64` is required here.

use serde::{Deserialize, Serialize};

/// Order side for an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Trading bot operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    /// Fully automatic trading.
    Auto,
    /// Manual trading only.
    Manual,
    /// Trading paused.
    Paused,
}

impl std::fmt::Display for BotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Latest price snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Trading symbol, e.g. "BTC".
    pub symbol: String,
    /// Last traded price.
    pub price: f64,
    /// 24-hour price change in percent.
    pub change_24h: f64,
}

/// Order book snapshot.
///
/// Levels are `(price, quantity)` pairs, serialized as two-element arrays
/// on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrderbookUpdate {
    /// Bid levels, best first.
    pub bids: Vec<(f64, f64)>,
    /// Ask levels, best first.
    pub asks: Vec<(f64, f64)>,
}

impl OrderbookUpdate {
    /// Returns the best bid price, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|(price, _)| *price)
    }

    /// Returns the best ask price, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|(price, _)| *price)
    }
}

/// A trade executed by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecuted {
    /// Order side.
    pub side: Side,
    /// Execution price.
    pub price: f64,
    /// Executed quantity.
    pub quantity: f64,
    /// Total cost of the trade.
    pub cost: f64,
}

/// Bot system status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Current operating mode.
    pub mode: BotMode,
    /// Points accumulated today.
    pub points_today: f64,
    /// Trading volume today.
    pub volume_today: f64,
}
