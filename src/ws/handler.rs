//! Axum WebSocket upgrade handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::connection::{Transport, run_connection};
use super::sockjs::SockJsInfo;
use crate::app_state::AppState;
use crate::stomp::SUBPROTOCOLS;

/// `GET <ws_endpoint>` and `GET <ws_endpoint>/websocket` — Upgrade HTTP
/// connection to a STOMP WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, &state, Transport::Raw)
}

/// `GET <ws_endpoint>/{server}/{session}/websocket` — SockJS WebSocket
/// transport carrying STOMP.
pub async fn sockjs_ws_handler(
    ws: WebSocketUpgrade,
    Path((server, session)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    tracing::debug!(%server, sockjs_session = %session, "sockjs websocket transport requested");
    upgrade(ws, &state, Transport::SockJs)
}

/// `GET <ws_endpoint>/info` — SockJS server info.
pub async fn sockjs_info_handler() -> impl IntoResponse {
    (
        [(
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, max-age=0",
        )],
        Json(SockJsInfo::generate()),
    )
}

fn upgrade(ws: WebSocketUpgrade, state: &AppState, transport: Transport) -> Response {
    let broker_rx = state.router.broker().subscribe();
    let router = Arc::clone(&state.router);
    let max_frame_bytes = state.config.max_frame_bytes;
    // Headroom over the frame limit for SockJS JSON quoting, and so frames
    // just over the limit still get an ERROR reply from the session.
    let max_message_bytes = max_frame_bytes.saturating_mul(2);

    ws.protocols(SUBPROTOCOLS)
        .max_message_size(max_message_bytes)
        .max_frame_size(max_message_bytes)
        .on_upgrade(move |socket| {
            run_connection(socket, broker_rx, router, max_frame_bytes, transport)
        })
}
