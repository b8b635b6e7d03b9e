//! Connection state tracking.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lifecycle state of a connection.
///
/// `Idle` is both the initial state and the state reached after any
/// terminal close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No handle, no attempt in flight.
    #[default]
    Idle,
    /// Connection attempt in flight.
    Connecting,
    /// Connected; handle live.
    Open,
    /// Manual close in progress.
    Closing,
    /// Unexpectedly closed; a reconnect timer is pending.
    Reconnecting,
}

impl ConnectionState {
    /// Returns true if the connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the connection is in a transitional state.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

/// Frame handed to the dispatch loop for transmission.
#[derive(Debug, Clone)]
pub(crate) enum Outbound {
    /// Raw text written as-is.
    Text(String),
}

/// Mutable connection state guarded by the client lock.
///
/// The optional channel senders are the transport handle: both are `Some`
/// exactly while a dispatch loop is live, so "at most one handle per
/// connection" holds by construction. `reconnect` is the single pending
/// timer slot.
#[derive(Debug, Default)]
pub(crate) struct InternalState {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Outbound frame queue into the dispatch loop.
    pub send_tx: Option<mpsc::Sender<Outbound>>,
    /// Shutdown signal into the dispatch loop.
    pub shutdown_tx: Option<mpsc::Sender<()>>,
    /// Pending reconnect timer, if any.
    pub reconnect: Option<JoinHandle<()>>,
    /// Teardown epoch, bumped on every manual disconnect.
    ///
    /// In-flight dials, pending timers, and the dispatch loop record the
    /// epoch they started under and stand down when it no longer matches,
    /// so a disconnect fences work suspended across the lock.
    pub epoch: u64,
}

impl InternalState {
    /// Returns true if a transport handle exists.
    pub fn has_handle(&self) -> bool {
        self.send_tx.is_some()
    }

    /// Installs a freshly opened handle and cancels any pending timer.
    pub fn mark_open(&mut self, send_tx: mpsc::Sender<Outbound>, shutdown_tx: mpsc::Sender<()>) {
        self.send_tx = Some(send_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.state = ConnectionState::Open;
        self.cancel_reconnect();
    }

    /// Clears the handle after a close.
    pub fn clear_handle(&mut self) {
        self.send_tx = None;
        self.shutdown_tx = None;
        self.state = ConnectionState::Idle;
    }

    /// Aborts and clears the pending reconnect timer, if any.
    pub fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.abort();
        }
    }
}
