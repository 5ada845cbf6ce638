//! SockJS WebSocket transport framing.
//!
//! SockJS clients fetch `<endpoint>/info` first, then open
//! `<endpoint>/<server>/<session>/websocket`. On that socket every server
//! message is one SockJS frame:
//!
//! | Frame | Meaning |
//! |---|---|
//! | `o` | session opened |
//! | `h` | heart-beat |
//! | `a["m1","m2"]` | one or more messages |
//! | `c[code,"reason"]` | session closed |
//!
//! Client messages are JSON arrays of strings. Here each string is one
//! STOMP frame.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Sent once when the transport opens.
pub const OPEN_FRAME: &str = "o";

/// Sent every [`HEARTBEAT_INTERVAL`] to keep proxies from closing the socket.
pub const HEARTBEAT_FRAME: &str = "h";

/// Interval between SockJS heart-beat frames.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Close code sent when the server ends the session.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Response of `GET <endpoint>/info`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SockJsInfo {
    /// Random value clients may use to seed their own generators.
    pub entropy: u32,
    /// Allowed origins, `*:*` for any.
    pub origins: Vec<String>,
    /// Whether load balancers need a JSESSIONID cookie for stickiness.
    pub cookie_needed: bool,
    /// Whether the WebSocket transport is available.
    pub websocket: bool,
}

impl SockJsInfo {
    /// Builds the info document with fresh entropy.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            entropy: uuid::Uuid::new_v4().as_fields().0,
            origins: vec!["*:*".to_owned()],
            cookie_needed: true,
            websocket: true,
        }
    }
}

/// Wraps encoded messages in one `a[...]` frame.
#[must_use]
pub fn message_frame(messages: Vec<String>) -> String {
    format!("a{}", Value::from(messages))
}

/// Builds a `c[code,"reason"]` frame.
#[must_use]
pub fn close_frame(code: u16, reason: &str) -> String {
    format!("c{}", Value::from(vec![Value::from(code), Value::from(reason)]))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
    Batch(Vec<String>),
    Single(String),
}

/// Splits a client message into the messages it carries.
///
/// Accepts a JSON array of strings, or a single JSON string. An empty
/// message carries nothing.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidFrame`] if the text is neither.
pub fn decode_messages(text: &str) -> Result<Vec<String>, GatewayError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(text) {
        Ok(Inbound::Batch(messages)) => Ok(messages),
        Ok(Inbound::Single(message)) => Ok(vec![message]),
        Err(_) => Err(GatewayError::InvalidFrame(
            "SockJS message must be a JSON array of strings".to_owned(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn message_frame_json_encodes_each_message() {
        let frame = message_frame(vec!["CONNECTED\nversion:1.2\n\n\0".to_owned(), "x\"y".to_owned()]);
        assert_eq!(frame, r#"a["CONNECTED\nversion:1.2\n\n\u0000","x\"y"]"#);
    }

    #[test]
    fn close_frame_carries_code_and_reason() {
        assert_eq!(close_frame(NORMAL_CLOSURE, "Normal closure"), r#"c[1000,"Normal closure"]"#);
    }

    #[test]
    fn decodes_batches_and_single_strings() {
        let Ok(batch) = decode_messages(r#"["SEND\n\n\u0000","DISCONNECT\n\n\u0000"]"#) else {
            panic!("batch decodes");
        };
        assert_eq!(batch, vec!["SEND\n\n\0", "DISCONNECT\n\n\0"]);

        let Ok(single) = decode_messages(r#""SEND\n\n\u0000""#) else {
            panic!("single string decodes");
        };
        assert_eq!(single, vec!["SEND\n\n\0"]);
    }

    #[test]
    fn empty_message_carries_nothing() {
        assert!(matches!(decode_messages(""), Ok(messages) if messages.is_empty()));
    }

    #[test]
    fn raw_stomp_text_is_rejected() {
        assert!(matches!(
            decode_messages("CONNECT\n\n\0"),
            Err(GatewayError::InvalidFrame(_))
        ));
    }

    #[test]
    fn info_advertises_websocket() {
        let info = SockJsInfo::generate();
        assert!(info.websocket);
        assert!(info.cookie_needed);
        assert_eq!(info.origins, vec!["*:*"]);
    }
}
