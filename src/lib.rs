//! # greeting-gateway
//!
//! STOMP-over-WebSocket greeting service with an in-memory topic broker.
//!
//! A client subscribes to `/topic/greetings` and sends `{"name": "..."}` to
//! `/app/hello`. After a configurable delay the server publishes
//! `{"content": "Hello, <escaped name>!"}` to every subscriber.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket + STOMP, HTTP)
//!     │
//!     ├── WS Handler / StompSession (ws/)
//!     ├── System endpoints (api/)
//!     │
//!     ├── MessageRouter (service/)
//!     ├── GreetingService (service/)
//!     │
//!     └── Broker (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod stomp;
pub mod ws;
