//! Destination routing table.
//!
//! Maps inbound application destinations to a [`MessageHandler`] and the
//! outbound destination its reply is published to. Populated once at
//! startup and read-only afterwards.
//!
//! ```text
//! SEND /app/hello ──► GreetingHandler ──► publish /topic/greetings
//! SEND /topic/x   ─────────────────────► publish /topic/x
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::domain::{Broker, BrokerMessage};
use crate::error::GatewayError;

/// Turns one JSON request body into one JSON reply body.
pub trait MessageHandler: Send + Sync + fmt::Debug {
    /// Handles a request body. The reply is published by the router.
    fn handle(&self, body: String) -> BoxFuture<'static, Result<String, GatewayError>>;
}

/// A registered handler and where its replies go.
#[derive(Debug, Clone)]
pub struct Route {
    /// Request handler.
    pub handler: Arc<dyn MessageHandler>,
    /// Destination the reply is published to.
    pub send_to: String,
}

/// What to do with a SEND, decided before any work is spawned.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Run a handler and publish its reply.
    Invoke(Route),
    /// Publish the body unchanged to a broker destination.
    Publish {
        /// Broker destination.
        destination: String,
    },
}

/// Routing table for application destinations.
#[derive(Debug)]
pub struct MessageRouter {
    app_prefix: String,
    broker_prefix: String,
    routes: HashMap<String, Route>,
    broker: Broker,
}

impl MessageRouter {
    /// Creates an empty table.
    ///
    /// `app_prefix` marks destinations handled by registered handlers
    /// (e.g. `/app`); `broker_prefix` marks destinations published straight
    /// to the broker (e.g. `/topic`).
    #[must_use]
    pub fn new(app_prefix: &str, broker_prefix: &str, broker: Broker) -> Self {
        Self {
            app_prefix: app_prefix.trim_end_matches('/').to_owned(),
            broker_prefix: broker_prefix.trim_end_matches('/').to_owned(),
            routes: HashMap::new(),
            broker,
        }
    }

    /// Registers `handler` for `app_prefix + path`, publishing replies to
    /// `send_to`. A later registration for the same path replaces the
    /// earlier one.
    #[must_use]
    pub fn route(
        mut self,
        path: &str,
        handler: Arc<dyn MessageHandler>,
        send_to: impl Into<String>,
    ) -> Self {
        let inbound = format!("{}{path}", self.app_prefix);
        let send_to = send_to.into();
        tracing::debug!(%inbound, %send_to, "registered message route");
        self.routes.insert(inbound, Route { handler, send_to });
        self
    }

    /// Returns the broker this router publishes to.
    #[must_use]
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Returns the broker destination prefix.
    #[must_use]
    pub fn broker_prefix(&self) -> &str {
        &self.broker_prefix
    }

    /// Lists registered `(inbound, outbound)` destination pairs, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .routes
            .iter()
            .map(|(inbound, route)| (inbound.clone(), route.send_to.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Decides how a SEND to `destination` is served.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownDestination`] if no handler is
    /// registered for an application destination, or the destination is
    /// under neither prefix.
    pub fn resolve(&self, destination: &str) -> Result<Dispatch, GatewayError> {
        if let Some(route) = self.routes.get(destination) {
            return Ok(Dispatch::Invoke(route.clone()));
        }
        if has_prefix(destination, &self.broker_prefix) {
            return Ok(Dispatch::Publish {
                destination: destination.to_owned(),
            });
        }
        Err(GatewayError::UnknownDestination(destination.to_owned()))
    }

    /// Runs a resolved dispatch and publishes the result.
    ///
    /// Returns the number of connections the message reached.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error; nothing is published in that case.
    pub async fn dispatch(&self, dispatch: Dispatch, body: String) -> Result<usize, GatewayError> {
        let message = match dispatch {
            Dispatch::Invoke(route) => {
                let reply = route.handler.handle(body).await?;
                BrokerMessage::json(route.send_to, reply)
            }
            Dispatch::Publish { destination } => BrokerMessage::json(destination, body),
        };
        let destination = message.destination.clone();
        let receivers = self.broker.publish(message);
        tracing::debug!(%destination, receivers, "published message");
        Ok(receivers)
    }
}

/// `true` if `destination` equals `prefix` or continues it with a `/`.
fn has_prefix(destination: &str, prefix: &str) -> bool {
    destination
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
