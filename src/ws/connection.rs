//! WebSocket connection loop.
//!
//! Reads STOMP frames from the client, feeds them to a [`StompSession`],
//! spawns accepted SENDs, and forwards matching broker messages.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::session::{Outcome, StompSession};
use super::sockjs;
use crate::domain::BrokerMessage;
use crate::service::{Dispatch, MessageRouter};
use crate::stomp::Frame;

/// How STOMP frames are carried on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// One STOMP frame per WebSocket text message.
    Raw,
    /// SockJS frames whose messages are STOMP frames.
    SockJs,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads frames from the client and answers them in order.
/// - Runs every SEND on its own task so slow handlers never stall the loop.
/// - Forwards broker messages matching the session's subscriptions.
/// - On SockJS transports, opens with `o` and sends `h` heart-beats.
pub async fn run_connection(
    socket: WebSocket,
    mut broker_rx: broadcast::Receiver<BrokerMessage>,
    router: Arc<MessageRouter>,
    max_frame_bytes: usize,
    transport: Transport,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut session = StompSession::new(max_frame_bytes);
    let mut heartbeat = interval_at(
        Instant::now() + sockjs::HEARTBEAT_INTERVAL,
        sockjs::HEARTBEAT_INTERVAL,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(session = %session.id(), ?transport, "ws connection opened");

    if transport == Transport::SockJs {
        let open = Message::Text(Utf8Bytes::from_static(sockjs::OPEN_FRAME));
        if ws_tx.send(open).await.is_err() {
            return;
        }
    }

    'connection: loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                let outcomes = match msg {
                    Some(Ok(Message::Text(text))) => receive_text(&mut session, transport, &text, &router),
                    Some(Ok(Message::Binary(bytes))) => vec![session.on_bytes(&bytes, &router)],
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => Vec::new(),
                    Some(Err(err)) => {
                        tracing::debug!(session = %session.id(), error = %err, "ws read failed");
                        break;
                    }
                };
                for Outcome { replies, dispatch, close } in outcomes {
                    if let Some((dispatch, body)) = dispatch {
                        spawn_dispatch(Arc::clone(&router), dispatch, body, session.id().to_owned());
                    }
                    if send_frames(&mut ws_tx, transport, &replies).await.is_err() {
                        break 'connection;
                    }
                    if close {
                        close_socket(&mut ws_tx, transport).await;
                        break 'connection;
                    }
                }
            }
            // Message from the broker
            message = broker_rx.recv() => {
                match message {
                    Ok(message) => {
                        let frames = session.on_broker_message(&message);
                        if send_frames(&mut ws_tx, transport, &frames).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(session = %session.id(), lagged = n, "ws client lagged behind broker");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            // SockJS keep-alive
            _ = heartbeat.tick(), if transport == Transport::SockJs => {
                let beat = Message::Text(Utf8Bytes::from_static(sockjs::HEARTBEAT_FRAME));
                if ws_tx.send(beat).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(session = %session.id(), "ws connection closed");
}

/// Feeds one text message to the session. A SockJS message may carry
/// several STOMP frames; handling stops at the first one that closes.
fn receive_text(
    session: &mut StompSession,
    transport: Transport,
    text: &str,
    router: &MessageRouter,
) -> Vec<Outcome> {
    match transport {
        Transport::Raw => vec![session.on_text(text, router)],
        Transport::SockJs => match sockjs::decode_messages(text) {
            Ok(messages) => {
                let mut outcomes = Vec::with_capacity(messages.len());
                for message in messages {
                    let outcome = session.on_text(&message, router);
                    let close = outcome.close;
                    outcomes.push(outcome);
                    if close {
                        break;
                    }
                }
                outcomes
            }
            Err(error) => vec![session.fail(&error, None)],
        },
    }
}

/// Runs a dispatch off the connection loop. Handler faults fail only this
/// exchange and are logged.
fn spawn_dispatch(router: Arc<MessageRouter>, dispatch: Dispatch, body: String, session: String) {
    tokio::spawn(async move {
        match router.dispatch(dispatch, body).await {
            Ok(receivers) => tracing::debug!(%session, receivers, "dispatch complete"),
            Err(err) => tracing::error!(%session, code = err.error_code(), error = %err, "message handler failed"),
        }
    });
}

async fn send_frames(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    transport: Transport,
    frames: &[Frame],
) -> Result<(), axum::Error> {
    if frames.is_empty() {
        return Ok(());
    }
    match transport {
        Transport::Raw => {
            for frame in frames {
                ws_tx.send(Message::text(frame.encode())).await?;
            }
        }
        Transport::SockJs => {
            let encoded = frames.iter().map(Frame::encode).collect();
            ws_tx
                .send(Message::text(sockjs::message_frame(encoded)))
                .await?;
        }
    }
    Ok(())
}

async fn close_socket(ws_tx: &mut SplitSink<WebSocket, Message>, transport: Transport) {
    if transport == Transport::SockJs {
        let frame = sockjs::close_frame(sockjs::NORMAL_CLOSURE, "Normal closure");
        let _ = ws_tx.send(Message::text(frame)).await;
    }
    let _ = ws_tx.send(Message::Close(None)).await;
}
