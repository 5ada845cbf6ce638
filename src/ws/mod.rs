//! WebSocket layer: upgrade, connection loop, STOMP sessions, subscriptions.
//!
//! The endpoint (default `/gs-guide-websocket`) carries STOMP frames, one
//! per text message. The same frames are also served over the SockJS
//! WebSocket transport. Clients subscribe to broker destinations and send
//! to application destinations.

pub mod connection;
pub mod handler;
pub mod session;
pub mod sockjs;
pub mod subscription;
