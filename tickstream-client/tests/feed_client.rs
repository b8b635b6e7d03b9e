//! End-to-end tests against an in-process WebSocket server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use tickstream_client::feed::FeedHandle;
use tickstream_client::ws::{ConnectionState, Envelope, FeedCallback, WsClient, WsConfig};
use tickstream_core::error::TransportError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn wait_for(mut cond: impl FnMut() -> bool, ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(ms);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Records every callback invocation for assertions.
#[derive(Clone, Default)]
struct Recorder(Arc<RecorderInner>);

#[derive(Default)]
struct RecorderInner {
    connected: AtomicUsize,
    disconnected: AtomicUsize,
    errors: AtomicUsize,
    envelopes: Mutex<Vec<Envelope>>,
}

impl Recorder {
    fn connected(&self) -> usize {
        self.0.connected.load(Ordering::SeqCst)
    }

    fn disconnected(&self) -> usize {
        self.0.disconnected.load(Ordering::SeqCst)
    }

    fn envelopes(&self) -> Vec<Envelope> {
        self.0.envelopes.lock().clone()
    }
}

#[async_trait]
impl FeedCallback for Recorder {
    async fn on_envelope(&self, envelope: Envelope) {
        self.0.envelopes.lock().push(envelope);
    }

    async fn on_connected(&self) {
        self.0.connected.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_disconnected(&self, _reason: Option<String>) {
        self.0.disconnected.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_error(&self, _error: TransportError) {
        self.0.errors.fetch_add(1, Ordering::SeqCst);
    }
}

fn client_with(url: &str, delay_ms: u64, auto_reconnect: bool) -> WsClient {
    WsClient::new(
        WsConfig::builder()
            .url(url)
            .auto_reconnect(auto_reconnect)
            .reconnect_delay(Duration::from_millis(delay_ms))
            .connect_timeout(Duration::from_secs(2))
            .build(),
    )
}

#[tokio::test]
async fn test_price_update_reaches_slot() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"price_update","data":{"symbol":"BTC","price":65000,"change_24h":1.2},"timestamp":"2024-01-01T00:00:00Z"}"#.to_string(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let feed = FeedHandle::with_config(
        WsConfig::builder()
            .url(&url)
            .reconnect_delay(Duration::from_millis(3000))
            .build(),
    );
    feed.connect().await.unwrap();

    let slots = feed.slots().clone();
    assert!(wait_for(|| slots.price.is_set(), 1000).await);

    let price = slots.price.get().unwrap();
    assert_eq!(price.symbol, "BTC");
    assert!((price.price - 65000.0).abs() < f64::EPSILON);
    assert!((price.change_24h - 1.2).abs() < f64::EPSILON);

    feed.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_liveness_probe_answered_with_bare_pong() {
    init_tracing();
    let (listener, url) = bind().await;

    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"ping","timestamp":"2024-01-01T00:00:00Z"}"#.to_string(),
        ))
        .await
        .unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        reply_tx.send(reply).unwrap();

        // Keep the connection up until the client side is done asserting.
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let client = client_with(&url, 3000, true);
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());
    client.connect().await.unwrap();

    let reply = reply_rx.await.unwrap();
    assert_eq!(reply, Message::Text("pong".to_string()));

    // The probe is answered internally and never dispatched.
    assert!(recorder.envelopes().is_empty());
    assert!(client.is_connected());

    client.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_unexpected_close_triggers_single_reconnect() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // The client should dial again after the fixed delay.
        let second = tokio::time::timeout(Duration::from_secs(2), listener.accept())
            .await
            .expect("no reconnect attempt")
            .unwrap();
        let _ws = accept_async(second.0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let client = client_with(&url, 300, true);
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());
    client.connect().await.unwrap();

    let rec = recorder.clone();
    assert!(wait_for(|| rec.disconnected() == 1, 1000).await);
    assert!(client.reconnect_pending());
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    let rec = recorder.clone();
    assert!(wait_for(|| rec.connected() == 2, 2000).await);
    assert!(client.is_connected());
    assert!(!client.reconnect_pending());
    assert_eq!(recorder.disconnected(), 1);

    server.await.unwrap();
    client.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // No re-dial may arrive once disconnect() ran.
        tokio::time::timeout(Duration::from_millis(800), listener.accept())
            .await
            .is_ok()
    });

    let client = client_with(&url, 300, true);
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());
    client.connect().await.unwrap();

    let rec = recorder.clone();
    assert!(wait_for(|| rec.disconnected() == 1, 1000).await);
    client.disconnect().await;

    assert_eq!(client.state(), ConnectionState::Idle);
    assert!(!client.reconnect_pending());

    let reconnected = server.await.unwrap();
    assert!(!reconnected, "reconnect fired after disconnect");
}

#[tokio::test]
async fn test_disconnect_during_handshake_leaves_idle() {
    init_tracing();
    let (listener, url) = bind().await;

    // Accept the TCP connection but stall the WebSocket handshake so the
    // dial is still suspended when disconnect() runs.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let _ = accept_async(stream).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let client = Arc::new(client_with(&url, 300, true));
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());

    let dialing = client.clone();
    let dial = tokio::spawn(async move { dialing.connect().await });

    assert!(
        wait_for(|| client.state() == ConnectionState::Connecting, 500).await,
        "dial never started"
    );
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Idle);

    // The handshake completes afterwards; the fresh stream is discarded
    // instead of becoming a live handle.
    dial.await.unwrap().unwrap();
    assert_eq!(client.state(), ConnectionState::Idle);
    assert!(!client.is_connected());
    assert!(!client.reconnect_pending());
    assert_eq!(recorder.connected(), 0);

    server.await.unwrap();
}

#[tokio::test]
async fn test_connect_is_idempotent_while_open() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = accept_async(stream).await.unwrap();

        // A second handshake would show up as another accept.
        tokio::time::timeout(Duration::from_millis(500), listener.accept())
            .await
            .is_ok()
    });

    let client = client_with(&url, 3000, true);
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());

    client.connect().await.unwrap();
    client.connect().await.unwrap();

    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(recorder.connected(), 1);

    let second_handshake = server.await.unwrap();
    assert!(!second_handshake);

    client.disconnect().await;
}

#[tokio::test]
async fn test_malformed_frame_dropped_connection_stays_open() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text("not json at all".to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(
            r#"{"type":"echo","data":"still alive","timestamp":""}"#.to_string(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let client = client_with(&url, 3000, true);
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());
    client.connect().await.unwrap();

    let rec = recorder.clone();
    assert!(wait_for(|| !rec.envelopes().is_empty(), 1000).await);

    // Only the well-formed frame was dispatched; the connection survived.
    let envelopes = recorder.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].kind, "echo");
    assert!(client.is_connected());
    assert_eq!(recorder.disconnected(), 0);

    client.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_unknown_tag_mutates_no_slot() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"unknown_tag","data":{},"timestamp":""}"#.to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"type":"system_status","data":{"mode":"paused","points_today":0,"volume_today":0},"timestamp":""}"#.to_string(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let feed = FeedHandle::with_config(WsConfig::builder().url(&url).build());
    feed.connect().await.unwrap();

    let slots = feed.slots().clone();
    assert!(wait_for(|| slots.status.is_set(), 1000).await);

    // The unknown tag arrived first and touched nothing.
    assert!(!slots.price.is_set());
    assert!(!slots.orderbook.is_set());
    assert!(!slots.trade.is_set());
    assert!(feed.is_connected());

    feed.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_send_while_idle_returns_false_and_mutates_nothing() {
    init_tracing();
    let feed = FeedHandle::with_config(WsConfig::builder().url("ws://127.0.0.1:9/ws").build());

    assert!(!feed.send_text("ping").await);
    assert_eq!(feed.state(), ConnectionState::Idle);
    assert!(!feed.slots().price.is_set());
    assert!(!feed.slots().status.is_set());
}

#[tokio::test]
async fn test_send_roundtrip_while_open() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        (first, second)
    });

    let client = client_with(&url, 3000, true);
    client.connect().await.unwrap();

    // Raw text passes through unchanged; structured values are JSON-encoded.
    assert!(client.send_text("hello").await);
    assert!(client.send_json(&serde_json::json!({"type": "echo"})).await);

    let (first, second) = server.await.unwrap();
    assert_eq!(first, Message::Text("hello".to_string()));
    assert_eq!(second, Message::Text(r#"{"type":"echo"}"#.to_string()));

    client.disconnect().await;
}

#[tokio::test]
async fn test_no_reconnect_when_disabled() {
    init_tracing();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        tokio::time::timeout(Duration::from_millis(600), listener.accept())
            .await
            .is_ok()
    });

    let client = client_with(&url, 100, false);
    let recorder = Recorder::default();
    client.set_callback(recorder.clone());
    client.connect().await.unwrap();

    let rec = recorder.clone();
    assert!(wait_for(|| rec.disconnected() == 1, 1000).await);
    assert!(!client.reconnect_pending());
    assert_eq!(client.state(), ConnectionState::Idle);

    let reconnected = server.await.unwrap();
    assert!(!reconnected);
}
