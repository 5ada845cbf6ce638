//! STOMP protocol layer: frame codec and version negotiation.
//!
//! The gateway speaks STOMP 1.0, 1.1 and 1.2 over WebSocket, one frame per
//! text message. Heart-beats are not negotiated (`heart-beat:0,0`).

pub mod frame;

pub use frame::{Command, Frame};

use crate::error::GatewayError;

/// STOMP versions the server speaks, lowest first.
pub const SUPPORTED_VERSIONS: [&str; 3] = ["1.0", "1.1", "1.2"];

/// WebSocket subprotocols offered during the upgrade, preferred first.
pub const SUBPROTOCOLS: [&str; 3] = ["v12.stomp", "v11.stomp", "v10.stomp"];

/// Picks the highest version listed in a CONNECT frame's `accept-version`
/// header that the server also speaks.
///
/// A missing header means the client only speaks 1.0.
///
/// # Errors
///
/// Returns [`GatewayError::UnsupportedVersion`] if the lists do not overlap.
pub fn negotiate_version(accept_version: Option<&str>) -> Result<&'static str, GatewayError> {
    let Some(accepted) = accept_version else {
        return Ok("1.0");
    };
    SUPPORTED_VERSIONS
        .iter()
        .rev()
        .find(|supported| accepted.split(',').any(|v| v.trim() == **supported))
        .copied()
        .ok_or_else(|| GatewayError::UnsupportedVersion(accepted.to_owned()))
}
