//! Domain layer: message records and the topic broker.
//!
//! This module contains the greeting request/response records, the HTML
//! escaping applied to untrusted names, and the broadcast broker that fans
//! published messages out to every connection.

pub mod broker;
pub mod greeting;
pub mod html;

pub use broker::{Broker, BrokerMessage};
pub use greeting::{Greeting, HelloMessage};
pub use html::html_escape;
