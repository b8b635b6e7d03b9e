//! Typed subscriber layer: projects inbound envelopes onto externally-owned
//! state slots.
//!
//! The mapping is static and total: six recognized tags, six effects, each a
//! last-write-wins replace or an informational log. Unrecognized tags are
//! logged and dropped without error. All writes happen on the dispatch task,
//! so slot readers only ever observe complete values.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use tickstream_core::config::FeedSettings;
use tickstream_core::data::{OrderbookUpdate, PriceUpdate, SystemStatus, TradeExecuted};
use tickstream_core::error::TransportError;

use crate::ws::{tags, ConnectionState, Envelope, FeedCallback, WsClient, WsConfig};

/// A shared latest-value cell.
///
/// The consumer owns the read side; the subscriber layer holds a clone for
/// writing. Replacement is last-write-wins with no merging.
#[derive(Debug)]
pub struct Slot<T>(Arc<RwLock<Option<T>>>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(Arc::new(RwLock::new(None)))
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Clone> Slot<T> {
    /// Returns a copy of the latest value, if any.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.0.read().clone()
    }

    /// Returns true if a value has been received.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }

    fn replace(&self, value: T) {
        *self.0.write() = Some(value);
    }
}

/// The externally-owned state slots the feed writes into.
///
/// The fifth informational sink (connection/echo events) is the `tracing`
/// log stream rather than a slot.
#[derive(Debug, Clone, Default)]
pub struct FeedSlots {
    /// Latest price snapshot.
    pub price: Slot<PriceUpdate>,
    /// Latest order book snapshot.
    pub orderbook: Slot<OrderbookUpdate>,
    /// Latest executed trade.
    pub trade: Slot<TradeExecuted>,
    /// Latest bot system status.
    pub status: Slot<SystemStatus>,
}

/// Static tag-to-effect projection of inbound envelopes.
pub struct TradingFeed {
    slots: FeedSlots,
}

impl TradingFeed {
    /// Creates a feed writing into the given slots.
    #[must_use]
    pub fn new(slots: FeedSlots) -> Self {
        Self { slots }
    }

    fn replace_slot<T>(&self, envelope: &Envelope, slot: &Slot<T>)
    where
        T: serde::de::DeserializeOwned + Clone,
    {
        match envelope.payload::<T>() {
            Ok(value) => slot.replace(value),
            Err(error) => {
                warn!(tag = %envelope.kind, %error, "dropping envelope with malformed payload");
            }
        }
    }
}

#[async_trait]
impl FeedCallback for TradingFeed {
    async fn on_envelope(&self, envelope: Envelope) {
        match envelope.kind.as_str() {
            tags::CONNECTION_ESTABLISHED => {
                info!(data = %envelope.data, "connection established");
            }
            tags::PRICE_UPDATE => {
                debug!("price update");
                self.replace_slot(&envelope, &self.slots.price);
            }
            tags::ORDERBOOK_UPDATE => {
                debug!("orderbook update");
                self.replace_slot(&envelope, &self.slots.orderbook);
            }
            tags::TRADE_EXECUTED => {
                info!(data = %envelope.data, "trade executed");
                self.replace_slot(&envelope, &self.slots.trade);
            }
            tags::SYSTEM_STATUS => {
                debug!("system status");
                self.replace_slot(&envelope, &self.slots.status);
            }
            tags::ECHO => {
                debug!(data = %envelope.data, "server echo");
            }
            other => {
                warn!(tag = %other, "unrecognized message type");
            }
        }
    }

    async fn on_connected(&self) {
        info!("trading feed connected");
    }

    async fn on_disconnected(&self, reason: Option<String>) {
        warn!(reason = reason.as_deref().unwrap_or("unknown"), "trading feed disconnected");
    }

    async fn on_error(&self, error: TransportError) {
        error!(%error, "trading feed error");
    }
}

/// Composed dashboard feed: client, subscriber layer, and slots.
///
/// The endpoint is chosen once from the settings at construction and never
/// re-evaluated.
///
/// # Example
///
/// ```ignore
/// use tickstream_client::feed::FeedHandle;
/// use tickstream_core::config::FeedSettings;
///
/// let feed = FeedHandle::new(&FeedSettings::default());
/// feed.connect().await?;
/// let price = feed.slots().price.get();
/// ```
pub struct FeedHandle {
    client: WsClient,
    slots: FeedSlots,
}

impl FeedHandle {
    /// Builds the feed from settings.
    #[must_use]
    pub fn new(settings: &FeedSettings) -> Self {
        Self::with_config(WsConfig::from_settings(settings))
    }

    /// Builds the feed from an explicit client configuration.
    #[must_use]
    pub fn with_config(config: WsConfig) -> Self {
        let slots = FeedSlots::default();
        let client = WsClient::new(config);
        client.set_callback(TradingFeed::new(slots.clone()));
        Self { client, slots }
    }

    /// Returns the state slots.
    #[must_use]
    pub fn slots(&self) -> &FeedSlots {
        &self.slots
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &WsClient {
        &self.client
    }

    /// Connects to the backend.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the connection attempt fails.
    pub async fn connect(&self) -> Result<(), TransportError> {
        self.client.connect().await
    }

    /// Disconnects from the backend.
    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    /// Sends a raw text payload. Returns `false` when not connected.
    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        self.client.send_text(text).await
    }

    /// Sends a structured payload as JSON. Returns `false` when not connected.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> bool {
        self.client.send_json(value).await
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    /// Returns whether the connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }
}
