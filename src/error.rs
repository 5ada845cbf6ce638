//! Gateway error types with STOMP error-code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Session-level
//! variants are reported to the client as STOMP `ERROR` frames (see
//! [`GatewayError::to_error_frame`]); handler faults are logged and fail only
//! the exchange that raised them.

use crate::stomp::Frame;

/// Server-side error enum with numeric code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           |
/// |-----------|--------------------|
/// | 1000–1999 | Frame / payload    |
/// | 2000–2999 | Session state      |
/// | 3000–3999 | Server / startup   |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The text received could not be parsed as a STOMP frame.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A header required by the frame's command is absent.
    #[error("missing required header '{0}'")]
    MissingHeader(String),

    /// The client offered no STOMP version the server speaks.
    #[error("unsupported protocol version(s): {0}")]
    UnsupportedVersion(String),

    /// The frame exceeds the configured size limit.
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Size of the rejected frame in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A message body could not be converted from or to JSON.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A frame other than CONNECT arrived before the session was connected.
    #[error("session is not connected")]
    NotConnected,

    /// CONNECT arrived on an already connected session.
    #[error("session is already connected")]
    AlreadyConnected,

    /// No handler or broker prefix matches the destination. The SEND is
    /// logged and dropped; the session stays open.
    #[error("no route for destination: {0}")]
    UnknownDestination(String),

    /// The subscription id is already in use on this session.
    #[error("subscription id already in use: {0}")]
    DuplicateSubscription(String),

    /// An environment variable holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidFrame(_) => 1001,
            Self::MissingHeader(_) => 1002,
            Self::UnsupportedVersion(_) => 1003,
            Self::FrameTooLarge { .. } => 1004,
            Self::InvalidPayload(_) => 1005,
            Self::NotConnected => 2001,
            Self::AlreadyConnected => 2002,
            Self::UnknownDestination(_) => 2003,
            Self::DuplicateSubscription(_) => 2004,
            Self::InvalidConfig(_) => 3001,
        }
    }

    /// Renders this error as a STOMP `ERROR` frame.
    ///
    /// `receipt` is the `receipt` header of the frame that failed, if the
    /// client asked for one.
    #[must_use]
    pub fn to_error_frame(&self, receipt: Option<&str>) -> Frame {
        let frame = Frame::error(
            &self.to_string(),
            &format!("code {}: {self}", self.error_code()),
        );
        match receipt {
            Some(id) => frame.header("receipt-id", id),
            None => frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stomp::Command;

    #[test]
    fn codes_fall_in_category_ranges() {
        assert_eq!(GatewayError::InvalidFrame("x".into()).error_code(), 1001);
        assert_eq!(GatewayError::NotConnected.error_code(), 2001);
        assert_eq!(GatewayError::InvalidConfig("x".into()).error_code(), 3001);
    }

    #[test]
    fn error_frame_carries_message_and_receipt() {
        let err = GatewayError::UnknownDestination("/app/nope".into());
        let frame = err.to_error_frame(Some("r-7"));
        assert_eq!(frame.command, Command::Error);
        assert_eq!(
            frame.get("message"),
            Some("no route for destination: /app/nope")
        );
        assert_eq!(frame.get("receipt-id"), Some("r-7"));
        assert!(frame.body.contains("code 2003"));
    }
}
