//! Service layer: message handlers and the routing table.

pub mod greeting_service;
pub mod router;

pub use greeting_service::{GreetingHandler, GreetingService};
pub use router::{Dispatch, MessageHandler, MessageRouter, Route};
