//! STOMP session state machine.
//!
//! [`StompSession`] holds the protocol state of one WebSocket connection
//! and turns incoming text into an [`Outcome`]: frames to send back, an
//! optional dispatch to spawn, and whether to close. It does no I/O, so the
//! connection loop in [`super::connection`] stays a thin shell around it.

use crate::domain::BrokerMessage;
use crate::error::GatewayError;
use crate::service::{Dispatch, MessageRouter};
use crate::stomp::{self, Command, Frame};

use super::subscription::SubscriptionManager;

/// Value of the `server` header in CONNECTED frames.
pub const SERVER_NAME: &str = concat!("greeting-gateway/", env!("CARGO_PKG_VERSION"));

/// Result of handling one client message.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Frames to write back to the client, in order.
    pub replies: Vec<Frame>,
    /// A resolved SEND to run off the connection loop, with its body.
    pub dispatch: Option<(Dispatch, String)>,
    /// Whether the connection must close after the replies are written.
    pub close: bool,
}

impl Outcome {
    fn failed(error: &GatewayError, receipt: Option<&str>) -> Self {
        Self {
            replies: vec![error.to_error_frame(receipt)],
            dispatch: None,
            close: true,
        }
    }
}

/// Protocol state of one STOMP-over-WebSocket connection.
#[derive(Debug)]
pub struct StompSession {
    id: String,
    version: Option<&'static str>,
    subscriptions: SubscriptionManager,
    max_frame_bytes: usize,
}

impl StompSession {
    /// Creates an unconnected session with a fresh id.
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: None,
            subscriptions: SubscriptionManager::new(),
            max_frame_bytes,
        }
    }

    /// Returns the session id sent in the CONNECTED frame.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the negotiated STOMP version once connected.
    #[must_use]
    pub const fn version(&self) -> Option<&'static str> {
        self.version
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.count()
    }

    /// Handles a binary WebSocket message, which must hold UTF-8 frame text.
    pub fn on_bytes(&mut self, bytes: &[u8], router: &MessageRouter) -> Outcome {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.on_text(text, router),
            Err(_) => self.fail(
                &GatewayError::InvalidFrame("binary message is not UTF-8".to_owned()),
                None,
            ),
        }
    }

    /// Handles one WebSocket text message.
    ///
    /// Any error yields a single ERROR frame and a close.
    pub fn on_text(&mut self, text: &str, router: &MessageRouter) -> Outcome {
        if text.len() > self.max_frame_bytes {
            let error = GatewayError::FrameTooLarge {
                size: text.len(),
                limit: self.max_frame_bytes,
            };
            return self.fail(&error, None);
        }
        let frame = match Frame::parse(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Outcome::default(),
            Err(error) => return self.fail(&error, None),
        };
        match self.on_frame(&frame, router) {
            Ok(outcome) => outcome,
            Err(error) => self.fail(&error, frame.receipt()),
        }
    }

    /// Converts a broker message into one MESSAGE frame per matching
    /// subscription. Unconnected sessions receive nothing.
    #[must_use]
    pub fn on_broker_message(&self, message: &BrokerMessage) -> Vec<Frame> {
        if self.version.is_none() {
            return Vec::new();
        }
        let content_type = message.content_type.as_deref().unwrap_or("text/plain");
        self.subscriptions
            .matching(&message.destination)
            .into_iter()
            .map(|subscription| {
                Frame::new(Command::Message)
                    .header("destination", &message.destination)
                    .header("subscription", subscription)
                    .header("message-id", &uuid::Uuid::new_v4().to_string())
                    .with_body(content_type, &message.body)
            })
            .collect()
    }

    /// Reports `error` to the client as an ERROR frame and closes.
    ///
    /// `receipt` is the receipt requested by the failing frame, if any.
    pub fn fail(&self, error: &GatewayError, receipt: Option<&str>) -> Outcome {
        tracing::warn!(session = %self.id, code = error.error_code(), error = %error, "stomp session failed");
        Outcome::failed(error, receipt)
    }

    fn on_frame(&mut self, frame: &Frame, router: &MessageRouter) -> Result<Outcome, GatewayError> {
        let mut outcome = Outcome::default();

        match frame.command {
            Command::Connect | Command::Stomp => {
                outcome.replies.push(self.connect(frame)?);
            }
            _ if self.version.is_none() => return Err(GatewayError::NotConnected),
            Command::Subscribe => {
                let destination = frame.require("destination")?;
                let id = match (frame.get("id"), self.version) {
                    (Some(id), _) => id,
                    (None, Some("1.0")) => destination,
                    (None, _) => return Err(GatewayError::MissingHeader("id".to_owned())),
                };
                self.subscriptions.subscribe(id, destination)?;
                tracing::debug!(session = %self.id, subscription = id, %destination, "subscribed");
            }
            Command::Unsubscribe => {
                let id = frame.require("id")?;
                if self.subscriptions.unsubscribe(id).is_some() {
                    tracing::debug!(session = %self.id, subscription = id, "unsubscribed");
                }
            }
            Command::Send => {
                let destination = frame.require("destination")?;
                match router.resolve(destination) {
                    Ok(dispatch) => {
                        tracing::debug!(session = %self.id, %destination, "accepted message");
                        outcome.dispatch = Some((dispatch, frame.body.clone()));
                    }
                    Err(error) => {
                        tracing::warn!(session = %self.id, %destination, error = %error, "dropping message");
                    }
                }
            }
            Command::Ack | Command::Nack => {}
            Command::Disconnect => {
                tracing::debug!(session = %self.id, "client disconnected");
                outcome.close = true;
            }
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                return Err(GatewayError::InvalidFrame(format!(
                    "{} is a server frame",
                    frame.command
                )));
            }
        }

        if let Some(receipt) = frame.receipt() {
            outcome
                .replies
                .push(Frame::new(Command::Receipt).header("receipt-id", receipt));
        }
        Ok(outcome)
    }

    fn connect(&mut self, frame: &Frame) -> Result<Frame, GatewayError> {
        if self.version.is_some() {
            return Err(GatewayError::AlreadyConnected);
        }
        let version = stomp::negotiate_version(frame.get("accept-version"))?;
        self.version = Some(version);
        tracing::info!(session = %self.id, %version, "stomp session connected");

        Ok(Frame::new(Command::Connected)
            .header("version", version)
            .header("heart-beat", "0,0")
            .header("server", SERVER_NAME)
            .header("session", &self.id))
    }
}
