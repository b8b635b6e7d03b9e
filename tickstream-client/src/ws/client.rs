//! WebSocket client with automatic reconnection and a reactive heartbeat.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use tickstream_core::error::TransportError;

use super::config::WsConfig;
use super::envelope::{Envelope, PONG_REPLY};
use super::state::{ConnectionState, InternalState, Outbound};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, TungsteniteMessage>;
type WsSource = SplitStream<WsStream>;

/// Callback trait for feed events.
///
/// All callbacks for one connection run sequentially on the dispatch task;
/// no two overlap.
#[async_trait]
pub trait FeedCallback: Send + Sync {
    /// Called for every dispatched envelope (liveness probes are answered
    /// internally and never reach this method).
    async fn on_envelope(&self, envelope: Envelope);

    /// Called when the connection is established.
    async fn on_connected(&self) {}

    /// Called when the connection is lost or closed.
    async fn on_disconnected(&self, reason: Option<String>) {
        let _ = reason;
    }

    /// Called when a transport error occurs. An error by itself does not
    /// close the connection; only an actual close transition does.
    async fn on_error(&self, error: TransportError) {
        let _ = error;
    }
}

/// Reconnecting WebSocket client for the dashboard feed.
///
/// One logical connection per client instance. The transport handle is
/// exclusively owned and exists at most once at any time; `connect` is a
/// no-op while a handle is live. On unexpected close a single fixed-delay
/// reconnect timer is armed; `disconnect` is the only path that suppresses
/// it.
///
/// Dropping the client cancels any pending timer and shuts the dispatch
/// loop down, so the handle and timer are released on every exit path of
/// the owning consumer.
///
/// # Example
///
/// ```ignore
/// use tickstream_client::ws::{WsClient, WsConfig};
///
/// let config = WsConfig::builder()
///     .url("ws://localhost:8000/ws")
///     .build();
///
/// let client = WsClient::new(config);
/// client.connect().await?;
/// assert!(client.send_text("ping").await);
/// ```
pub struct WsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: WsConfig,
    state: RwLock<InternalState>,
    callback: RwLock<Option<Arc<dyn FeedCallback>>>,
}

impl WsClient {
    /// Creates a new client with the given configuration.
    #[must_use]
    pub fn new(config: WsConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                state: RwLock::new(InternalState::default()),
                callback: RwLock::new(None),
            }),
        }
    }

    /// Sets the callback for receiving events.
    ///
    /// Dispatch loops spawned before this call keep the callback they were
    /// started with, so register the callback before connecting.
    pub fn set_callback(&self, callback: impl FeedCallback + 'static) {
        *self.inner.callback.write() = Some(Arc::new(callback));
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.read().state
    }

    /// Returns whether the connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.read().state.is_open()
    }

    /// Returns whether a reconnect timer is pending.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.inner.state.read().reconnect.is_some()
    }

    /// Connects to the server.
    ///
    /// No-op if a handle already exists or a connect is in flight. On
    /// success any pending reconnect timer is cancelled. On failure the
    /// error is logged, surfaced through the error callback, and returned;
    /// the client stays usable and `connect` may be called again.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the connection attempt fails.
    pub async fn connect(&self) -> Result<(), TransportError> {
        ClientInner::connect(&self.inner).await
    }

    /// Disconnects from the server.
    ///
    /// Cancels any pending reconnect timer, abandons any dial still in
    /// flight, closes and clears the handle if one exists, and leaves the
    /// client `Idle`. Idempotent and safe to call from any state; a later
    /// `connect` resumes normal operation.
    pub async fn disconnect(&self) {
        let shutdown_tx = {
            let mut st = self.inner.state.write();
            st.epoch = st.epoch.wrapping_add(1);
            st.cancel_reconnect();
            st.send_tx = None;
            let shutdown_tx = st.shutdown_tx.take();
            st.state = if shutdown_tx.is_some() {
                ConnectionState::Closing
            } else {
                ConnectionState::Idle
            };
            shutdown_tx
        };

        let Some(shutdown_tx) = shutdown_tx else {
            self.inner.state.write().state = ConnectionState::Idle;
            return;
        };

        let _ = shutdown_tx.send(()).await;
        self.inner.state.write().state = ConnectionState::Idle;
        info!(url = %self.inner.config.url, "WebSocket disconnected");

        if let Some(cb) = self.inner.callback() {
            cb.on_disconnected(Some("client disconnect".to_string())).await;
        }
    }

    /// Sends a raw text payload.
    ///
    /// Returns `false` (and logs) if the connection is not open or the
    /// write fails; never panics.
    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        self.send_frame(text.into()).await
    }

    /// JSON-encodes a structured payload and sends it.
    ///
    /// Returns `false` (and logs) on serialization failure, if the
    /// connection is not open, or if the write fails; never panics.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send_frame(json).await,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound payload");
                false
            }
        }
    }

    async fn send_frame(&self, text: String) -> bool {
        let sender = {
            let st = self.inner.state.read();
            if st.state.is_open() {
                st.send_tx.clone()
            } else {
                None
            }
        };

        let Some(sender) = sender else {
            warn!(url = %self.inner.config.url, "not connected, dropping outbound frame");
            return false;
        };

        match sender.send(Outbound::Text(text)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "outbound queue closed, frame dropped");
                false
            }
        }
    }
}

impl ClientInner {
    fn callback(&self) -> Option<Arc<dyn FeedCallback>> {
        self.callback.read().clone()
    }

    async fn connect(inner: &Arc<Self>) -> Result<(), TransportError> {
        let attempt = {
            let mut st = inner.state.write();
            if st.has_handle() || st.state == ConnectionState::Connecting {
                debug!(url = %inner.config.url, "connect skipped, connection already live");
                return Ok(());
            }
            st.state = ConnectionState::Connecting;
            st.epoch
        };

        let dialed = timeout(
            inner.config.connect_timeout(),
            connect_async(&inner.config.url),
        )
        .await;

        let ws_stream = match dialed {
            Err(_) => {
                return Self::connect_failed(
                    inner,
                    attempt,
                    TransportError::Timeout {
                        timeout_ms: inner.config.connect_timeout_ms,
                    },
                )
                .await;
            }
            Ok(Err(e)) => {
                return Self::connect_failed(
                    inner,
                    attempt,
                    TransportError::ConnectionFailed {
                        reason: e.to_string(),
                    },
                )
                .await;
            }
            Ok(Ok((stream, _response))) => stream,
        };

        let (sink, stream) = ws_stream.split();
        let (send_tx, send_rx) = mpsc::channel(inner.config.send_queue_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        // A disconnect while the dial was suspended bumps the epoch; the
        // fresh stream must not become the handle in that case.
        let cancelled = {
            let mut st = inner.state.write();
            if st.epoch == attempt {
                st.mark_open(send_tx, shutdown_tx);
                false
            } else {
                true
            }
        };

        if cancelled {
            debug!(url = %inner.config.url, "dial cancelled by disconnect, closing fresh stream");
            if let Ok(mut ws) = sink.reunite(stream) {
                let _ = ws.close(None).await;
            }
            return Ok(());
        }

        let callback = inner.callback();
        tokio::spawn(run_connection(
            sink,
            stream,
            send_rx,
            shutdown_rx,
            Arc::downgrade(inner),
            callback.clone(),
            attempt,
        ));

        info!(url = %inner.config.url, "WebSocket connected");
        if let Some(cb) = callback {
            cb.on_connected().await;
        }

        Ok(())
    }

    async fn connect_failed(
        inner: &Arc<Self>,
        attempt: u64,
        error: TransportError,
    ) -> Result<(), TransportError> {
        {
            let mut st = inner.state.write();
            if st.epoch != attempt {
                // Disconnect already settled the state; nothing to report.
                debug!(url = %inner.config.url, "dial cancelled by disconnect");
                return Ok(());
            }
            st.state = if st.reconnect.is_some() {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Idle
            };
        }

        error!(url = %inner.config.url, %error, "WebSocket connection failed");
        if let Some(cb) = inner.callback() {
            cb.on_error(error.clone()).await;
        }

        Err(error)
    }

    /// Arms the fixed-delay reconnect timer. No-op if reconnection is
    /// disabled or a timer is already pending.
    fn arm_reconnect(inner: &Arc<Self>, st: &mut InternalState) {
        if !inner.config.auto_reconnect || st.reconnect.is_some() {
            return;
        }

        st.state = ConnectionState::Reconnecting;
        let delay = inner.config.reconnect_delay();
        let armed = st.epoch;
        let weak = Arc::downgrade(inner);

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };

            {
                // A disconnect's abort can land after the sleep has already
                // finished; the epoch check closes that window.
                let mut st = inner.state.write();
                if st.epoch != armed {
                    return;
                }
                // Timer slot is cleared before the re-dial.
                st.reconnect = None;
            }
            info!(url = %inner.config.url, "attempting to reconnect");

            if let Err(error) = Self::connect(&inner).await {
                warn!(url = %inner.config.url, %error, "reconnect attempt failed");
                let mut st = inner.state.write();
                if st.epoch == armed
                    && !st.has_handle()
                    && st.state != ConnectionState::Connecting
                {
                    Self::arm_reconnect(&inner, &mut st);
                }
            }
        });

        st.reconnect = Some(timer);
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        if let Some(timer) = st.reconnect.take() {
            timer.abort();
        }
        if let Some(shutdown_tx) = st.shutdown_tx.take() {
            let _ = shutdown_tx.try_send(());
        }
    }
}

/// Per-connection dispatch loop.
///
/// All transport events for one handle run through this single task:
/// outbound writes, inbound frames, the heartbeat reply, and the close
/// transition, each to completion before the next.
async fn run_connection(
    mut sink: WsSink,
    mut stream: WsSource,
    mut send_rx: mpsc::Receiver<Outbound>,
    mut shutdown_rx: mpsc::Receiver<()>,
    inner: Weak<ClientInner>,
    callback: Option<Arc<dyn FeedCallback>>,
    epoch: u64,
) {
    loop {
        tokio::select! {
            // Shutdown wins over any queued frames: once disconnect() has
            // signalled, no further message callbacks fire for this handle.
            biased;

            _ = shutdown_rx.recv() => {
                debug!("shutdown signal received");
                let _ = sink.close().await;
                return;
            }

            Some(frame) = send_rx.recv() => {
                let Outbound::Text(text) = frame;
                if let Err(e) = sink.send(TungsteniteMessage::Text(text)).await {
                    error!(error = %e, "failed to send frame");
                    if let Some(cb) = &callback {
                        cb.on_error(TransportError::WebSocket {
                            reason: e.to_string(),
                        }).await;
                    }
                }
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(TungsteniteMessage::Text(text))) => {
                        dispatch_text(&mut sink, &callback, &text).await;
                    }
                    Some(Ok(TungsteniteMessage::Binary(data))) => {
                        match Envelope::from_slice(&data) {
                            Ok(envelope) => dispatch_envelope(&mut sink, &callback, envelope).await,
                            Err(error) => warn!(%error, "dropping malformed binary frame"),
                        }
                    }
                    Some(Ok(TungsteniteMessage::Ping(data))) => {
                        if let Err(e) = sink.send(TungsteniteMessage::Pong(data)).await {
                            warn!(error = %e, "failed to send pong frame");
                        }
                    }
                    Some(Ok(TungsteniteMessage::Pong(_))) => {
                        debug!("pong frame ignored");
                    }
                    Some(Ok(TungsteniteMessage::Close(frame))) => {
                        info!("server sent close frame");
                        let reason = frame.map(|f| f.reason.to_string());
                        remote_close(&inner, &callback, reason, epoch).await;
                        return;
                    }
                    Some(Ok(TungsteniteMessage::Frame(_))) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket transport error");
                        if let Some(cb) = &callback {
                            cb.on_error(TransportError::WebSocket {
                                reason: e.to_string(),
                            }).await;
                        }
                        remote_close(&inner, &callback, Some(e.to_string()), epoch).await;
                        return;
                    }
                    None => {
                        remote_close(&inner, &callback, Some("stream ended".to_string()), epoch)
                            .await;
                        return;
                    }
                }
            }
        }
    }
}

/// Decodes a text frame and dispatches it. Malformed frames are logged and
/// dropped; the connection stays open.
async fn dispatch_text(sink: &mut WsSink, callback: &Option<Arc<dyn FeedCallback>>, text: &str) {
    match Envelope::from_text(text) {
        Ok(envelope) => dispatch_envelope(sink, callback, envelope).await,
        Err(error) => warn!(%error, "dropping malformed frame"),
    }
}

/// Answers liveness probes inline, forwards everything else.
///
/// The probe reply is a bare text literal, not a structured envelope, and
/// goes out within the same dispatch step the probe arrived in.
async fn dispatch_envelope(
    sink: &mut WsSink,
    callback: &Option<Arc<dyn FeedCallback>>,
    envelope: Envelope,
) {
    if envelope.is_ping() {
        debug!("liveness probe received");
        if let Err(e) = sink.send(TungsteniteMessage::Text(PONG_REPLY.to_string())).await {
            warn!(error = %e, "failed to send heartbeat reply");
        }
        return;
    }

    if let Some(cb) = callback {
        cb.on_envelope(envelope).await;
    }
}

/// Handles an unexpected close: clears the handle, arms the reconnect
/// timer when enabled, and notifies the callback.
///
/// When a manual disconnect has already torn this handle down (the epoch
/// no longer matches), the close is for a superseded handle: nothing is
/// armed and no second disconnect callback fires.
async fn remote_close(
    inner: &Weak<ClientInner>,
    callback: &Option<Arc<dyn FeedCallback>>,
    reason: Option<String>,
    epoch: u64,
) {
    if let Some(inner) = inner.upgrade() {
        let mut st = inner.state.write();
        if st.epoch != epoch {
            debug!("close of a superseded handle ignored");
            return;
        }
        st.clear_handle();
        ClientInner::arm_reconnect(&inner, &mut st);
    }

    if let Some(cb) = callback {
        cb.on_disconnected(reason).await;
    }
}
