//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::Broker;
use crate::service::{GreetingHandler, GreetingService, MessageRouter};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Routing table; owns the broker handle.
    pub router: Arc<MessageRouter>,
    /// Configuration the state was built from.
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Builds the broker and registers the message routes:
    ///
    /// | Inbound                | Handler           | Outbound                 |
    /// |------------------------|-------------------|--------------------------|
    /// | `<app prefix>/hello`   | [`GreetingHandler`] | `<broker prefix>/greetings` |
    #[must_use]
    pub fn from_config(config: GatewayConfig) -> Self {
        let broker = Broker::new(config.broker_capacity);
        let greetings = Arc::new(GreetingService::new(config.greeting_delay));

        let router = MessageRouter::new(
            &config.app_destination_prefix,
            &config.broker_destination_prefix,
            broker,
        )
        .route(
            "/hello",
            Arc::new(GreetingHandler::new(greetings)),
            format!("{}/greetings", config.broker_destination_prefix),
        );

        Self {
            router: Arc::new(router),
            config: Arc::new(config),
        }
    }
}
