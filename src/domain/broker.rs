//! In-memory topic broker.
//!
//! [`Broker`] wraps a [`tokio::sync::broadcast`] channel. Every published
//! [`BrokerMessage`] reaches every WebSocket connection, and each connection
//! filters by its own subscriptions.

use tokio::sync::broadcast;

/// A payload published to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Destination the payload was published to (e.g. `/topic/greetings`).
    pub destination: String,
    /// MIME type of `body`, if known.
    pub content_type: Option<String>,
    /// Serialized payload.
    pub body: String,
}

impl BrokerMessage {
    /// Creates a JSON message for `destination`.
    #[must_use]
    pub fn json(destination: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            content_type: Some("application/json".to_owned()),
            body: body.into(),
        }
    }
}

/// Broadcast broker for [`BrokerMessage`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest messages are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct Broker {
    sender: broadcast::Sender<BrokerMessage>,
}

impl Broker {
    /// Creates a new `Broker` with the given channel capacity.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a message to all connections.
    ///
    /// Returns the number of receivers that got the message. With no
    /// receivers the message is dropped and `0` is returned.
    pub fn publish(&self, message: BrokerMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Creates a receiver for all future messages.
    ///
    /// Each WebSocket connection calls this once on upgrade.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerMessage> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
