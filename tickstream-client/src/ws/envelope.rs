//! Inbound message envelope.

use serde::{Deserialize, Serialize};
use tickstream_core::error::TransportError;

/// Literal reply sent for an inbound liveness probe.
///
/// Deliberate protocol asymmetry: the probe arrives as a structured
/// envelope, the acknowledgement goes out as bare text.
pub const PONG_REPLY: &str = "pong";

/// Recognized envelope type tags.
pub mod tags {
    /// Server-initiated liveness probe; answered, never dispatched.
    pub const PING: &str = "ping";
    /// Post-connect greeting from the server.
    pub const CONNECTION_ESTABLISHED: &str = "connection_established";
    /// Latest price snapshot.
    pub const PRICE_UPDATE: &str = "price_update";
    /// Order book snapshot.
    pub const ORDERBOOK_UPDATE: &str = "orderbook_update";
    /// Trade executed by the bot.
    pub const TRADE_EXECUTED: &str = "trade_executed";
    /// Bot system status snapshot.
    pub const SYSTEM_STATUS: &str = "system_status";
    /// Server echo of a client message.
    pub const ECHO: &str = "echo";
}

/// Structured inbound wire unit: `{ "type": ..., "data": ..., "timestamp": ... }`.
///
/// `data` and `timestamp` are optional on the wire; the server's liveness
/// probe carries only `type` and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque payload, interpreted per tag by the subscriber layer.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Server emission timestamp (RFC 3339 text).
    #[serde(default)]
    pub timestamp: String,
}

impl Envelope {
    /// Decodes an envelope from a text frame.
    pub fn from_text(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(|e| TransportError::Decode {
            reason: e.to_string(),
        })
    }

    /// Decodes an envelope from a binary frame.
    pub fn from_slice(data: &[u8]) -> Result<Self, TransportError> {
        serde_json::from_slice(data).map_err(|e| TransportError::Decode {
            reason: e.to_string(),
        })
    }

    /// Returns true if this envelope is a liveness probe.
    #[must_use]
    pub fn is_ping(&self) -> bool {
        self.kind == tags::PING
    }

    /// Deserializes the payload into a concrete type.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_value(self.data.clone()).map_err(|e| TransportError::Decode {
            reason: e.to_string(),
        })
    }
}
