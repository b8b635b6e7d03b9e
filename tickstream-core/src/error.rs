//! Transport error types.
//!
//! Every failure in the feed subsystem maps onto one of these variants and
//! leaves the connection in a well-defined, still-usable state. Nothing here
//! is fatal to the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the WebSocket transport layer.
///
/// # Examples
///
/// ```
/// use tickstream_core::error::TransportError;
///
/// let error = TransportError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportError {
    /// Connection to the backend failed.
    #[error("[Transport] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connection attempt timed out.
    #[error("[Transport] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// WebSocket protocol error.
    #[error("[Transport] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// Connection was closed.
    #[error("[Transport] Connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure.
        reason: String,
    },

    /// Inbound or outbound payload could not be (de)serialized.
    #[error("[Transport] Decode error: {reason}")]
    Decode {
        /// Reason for the decode failure.
        reason: String,
    },
}

impl TransportError {
    /// Returns true if this error is recoverable (connecting again can succeed).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}
