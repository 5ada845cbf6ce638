//! Greeting service: renders greetings after a simulated latency.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::router::MessageHandler;
use crate::domain::{Greeting, HelloMessage};
use crate::error::GatewayError;

/// Produces a [`Greeting`] for each [`HelloMessage`] after a fixed delay.
///
/// Stateless apart from the delay; every request is independent.
#[derive(Debug, Clone)]
pub struct GreetingService {
    delay: Duration,
}

impl GreetingService {
    /// Creates a service that waits `delay` before answering.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Returns the configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits the configured delay on a tokio timer, then builds the greeting.
    ///
    /// The returned future is never ready before the delay has elapsed.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` lets the router treat every
    /// handler the same way.
    pub async fn greet(&self, message: HelloMessage) -> Result<Greeting, GatewayError> {
        tokio::time::sleep(self.delay).await;
        Ok(Greeting::for_name(&message.name))
    }
}

/// [`MessageHandler`] adapter that decodes a JSON [`HelloMessage`] and
/// encodes the JSON [`Greeting`].
#[derive(Debug, Clone)]
pub struct GreetingHandler {
    service: Arc<GreetingService>,
}

impl GreetingHandler {
    /// Wraps a shared [`GreetingService`].
    #[must_use]
    pub const fn new(service: Arc<GreetingService>) -> Self {
        Self { service }
    }
}

impl MessageHandler for GreetingHandler {
    fn handle(&self, body: String) -> BoxFuture<'static, Result<String, GatewayError>> {
        let service = Arc::clone(&self.service);
        async move {
            let message: HelloMessage = serde_json::from_str(&body)?;
            let greeting = service.greet(message).await?;
            Ok(serde_json::to_string(&greeting)?)
        }
        .boxed()
    }
}
