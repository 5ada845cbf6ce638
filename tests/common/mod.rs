//! Integration-test harness: a gateway on an ephemeral port and a minimal
//! STOMP client over `tokio-tungstenite`.

#![allow(dead_code, clippy::panic)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use greeting_gateway::api::build_app;
use greeting_gateway::app_state::AppState;
use greeting_gateway::config::GatewayConfig;
use greeting_gateway::error::GatewayError;
use greeting_gateway::stomp::{Command, Frame};

/// Wait applied to handshakes and receipts.
pub const CONTROL_WAIT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A gateway serving on `127.0.0.1:<ephemeral>`, stopped on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Boots a gateway whose greetings take `delay`.
    pub async fn start(delay: Duration) -> Self {
        Self::with_config(GatewayConfig {
            greeting_delay: delay,
            ..GatewayConfig::default()
        })
        .await
    }

    /// Boots a gateway with `config`; its listen address is ignored.
    pub async fn with_config(config: GatewayConfig) -> Self {
        let app = build_app(AppState::from_config(config));

        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind ephemeral port");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener has an address");
        };
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, handle }
    }

    /// STOMP WebSocket URL of the default endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/gs-guide-websocket", self.addr)
    }

    /// SockJS WebSocket transport URL for a fresh session.
    pub fn sockjs_url(&self) -> String {
        let session = uuid::Uuid::new_v4().simple().to_string();
        format!("{}/000/{session}/websocket", self.ws_url())
    }

    /// Plain HTTP URL for `path`.
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// First failure observed by a client session.
#[derive(Debug, thiserror::Error)]
pub enum SessionFailure {
    /// The WebSocket transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    /// An HTTP request failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server sent an ERROR frame.
    #[error("server error frame: {0}")]
    Protocol(String),
    /// The server sent a frame the session did not expect.
    #[error("unexpected frame: {0}")]
    Unexpected(String),
    /// The server sent text that is not a valid frame, or a body that does
    /// not decode.
    #[error("undecodable data: {0}")]
    Decode(#[from] GatewayError),
    /// The server closed the connection.
    #[error("connection closed")]
    Closed,
    /// Nothing arrived in time.
    #[error("nothing received within {0:?}")]
    Timeout(Duration),
}

/// How frames are carried on the client's socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Raw,
    SockJs,
}

/// Minimal STOMP client session.
pub struct StompClient {
    ws: WsStream,
    framing: Framing,
    pending: VecDeque<Frame>,
    receipts: u32,
}

impl StompClient {
    /// Opens a WebSocket without sending CONNECT.
    pub async fn open(url: &str) -> Result<Self, SessionFailure> {
        let (ws, _) = connect_async(url).await?;
        Ok(Self::over(ws, Framing::Raw))
    }

    /// Opens a WebSocket and completes the STOMP handshake.
    pub async fn connect(url: &str) -> Result<Self, SessionFailure> {
        Self::open(url).await?.handshake().await
    }

    /// Fetches `<endpoint>/info`, opens the SockJS WebSocket transport, and
    /// waits for its `o` frame. Does not send CONNECT.
    pub async fn open_sockjs(server: &TestServer) -> Result<Self, SessionFailure> {
        let info: serde_json::Value = reqwest::get(server.http_url("/gs-guide-websocket/info"))
            .await?
            .error_for_status()?
            .json()
            .await?;
        if info.get("websocket") != Some(&serde_json::Value::Bool(true)) {
            return Err(SessionFailure::Unexpected(info.to_string()));
        }

        let (mut ws, _) = connect_async(server.sockjs_url()).await?;
        match timeout(CONTROL_WAIT, ws.next()).await {
            Err(_) => Err(SessionFailure::Timeout(CONTROL_WAIT)),
            Ok(None) => Err(SessionFailure::Closed),
            Ok(Some(Err(err))) => Err(err.into()),
            Ok(Some(Ok(Message::Text(text)))) if text.as_str() == "o" => {
                Ok(Self::over(ws, Framing::SockJs))
            }
            Ok(Some(Ok(other))) => Err(SessionFailure::Unexpected(other.to_string())),
        }
    }

    /// Opens a SockJS session and completes the STOMP handshake.
    pub async fn connect_sockjs(server: &TestServer) -> Result<Self, SessionFailure> {
        Self::open_sockjs(server).await?.handshake().await
    }

    fn over(ws: WsStream, framing: Framing) -> Self {
        Self {
            ws,
            framing,
            pending: VecDeque::new(),
            receipts: 0,
        }
    }

    async fn handshake(mut self) -> Result<Self, SessionFailure> {
        let connect = Frame::new(Command::Connect)
            .header("accept-version", "1.1,1.2")
            .header("host", "localhost");
        self.send_frame(&connect).await?;

        let reply = self.next_frame(CONTROL_WAIT).await?;
        match reply.command {
            Command::Connected => Ok(self),
            Command::Error => Err(error_of(&reply)),
            _ => Err(SessionFailure::Unexpected(reply.to_string())),
        }
    }

    /// Sends one frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<(), SessionFailure> {
        self.send_raw(&frame.encode()).await
    }

    /// Sends arbitrary text as one STOMP message, wrapped in a SockJS
    /// array on SockJS sessions.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), SessionFailure> {
        let payload = match self.framing {
            Framing::Raw => text.to_owned(),
            Framing::SockJs => serde_json::to_string(&[text]).map_err(GatewayError::from)?,
        };
        self.ws.send(Message::text(payload)).await?;
        Ok(())
    }

    /// Subscribes and waits for the server to confirm with a receipt, so a
    /// later publish from any connection is guaranteed to reach it.
    pub async fn subscribe(&mut self, id: &str, destination: &str) -> Result<(), SessionFailure> {
        let frame = Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination);
        self.send_with_receipt(frame).await
    }

    /// Sends a JSON body to `destination`.
    pub async fn send_json<T: Serialize>(
        &mut self,
        destination: &str,
        payload: &T,
    ) -> Result<(), SessionFailure> {
        let body = serde_json::to_string(payload).map_err(GatewayError::from)?;
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .with_body("application/json", &body);
        self.send_frame(&frame).await
    }

    /// Waits for the next frame, skipping heart-beats and control messages.
    pub async fn next_frame(&mut self, wait: Duration) -> Result<Frame, SessionFailure> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let message = match timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Err(SessionFailure::Timeout(wait)),
                Ok(None) => return Err(SessionFailure::Closed),
                Ok(Some(message)) => message?,
            };
            match message {
                Message::Text(text) => match self.framing {
                    Framing::Raw => {
                        if let Some(frame) = Frame::parse(text.as_str())? {
                            return Ok(frame);
                        }
                    }
                    Framing::SockJs => self.unwrap_sockjs(text.as_str())?,
                },
                Message::Close(_) => return Err(SessionFailure::Closed),
                _ => {}
            }
        }
    }

    /// Waits for the next MESSAGE frame. Any other frame is a failure.
    pub async fn next_message(&mut self, wait: Duration) -> Result<Frame, SessionFailure> {
        let frame = self.next_frame(wait).await?;
        match frame.command {
            Command::Message => Ok(frame),
            Command::Error => Err(error_of(&frame)),
            _ => Err(SessionFailure::Unexpected(frame.to_string())),
        }
    }

    /// Waits for the next MESSAGE frame and decodes its JSON body.
    pub async fn receive<T: DeserializeOwned>(&mut self, wait: Duration) -> Result<T, SessionFailure> {
        let frame = self.next_message(wait).await?;
        Ok(serde_json::from_str(&frame.body).map_err(GatewayError::from)?)
    }

    /// Sends DISCONNECT and waits for its receipt.
    pub async fn disconnect(mut self) -> Result<(), SessionFailure> {
        self.send_with_receipt(Frame::new(Command::Disconnect)).await
    }

    /// Queues the STOMP frames of one SockJS message.
    fn unwrap_sockjs(&mut self, text: &str) -> Result<(), SessionFailure> {
        match text.split_at_checked(1) {
            Some(("a", payload)) => {
                let messages: Vec<String> =
                    serde_json::from_str(payload).map_err(GatewayError::from)?;
                for message in messages {
                    if let Some(frame) = Frame::parse(&message)? {
                        self.pending.push_back(frame);
                    }
                }
                Ok(())
            }
            Some(("c", _)) => Err(SessionFailure::Closed),
            Some(("h", _)) => Ok(()),
            _ => Err(SessionFailure::Unexpected(text.to_owned())),
        }
    }

    /// Sends `frame` with a fresh receipt and waits for the RECEIPT.
    pub async fn send_with_receipt(&mut self, frame: Frame) -> Result<(), SessionFailure> {
        self.receipts += 1;
        let receipt = format!("receipt-{}", self.receipts);
        self.send_frame(&frame.header("receipt", &receipt)).await?;

        let reply = self.next_frame(CONTROL_WAIT).await?;
        match reply.command {
            Command::Receipt if reply.get("receipt-id") == Some(receipt.as_str()) => Ok(()),
            Command::Error => Err(error_of(&reply)),
            _ => Err(SessionFailure::Unexpected(reply.to_string())),
        }
    }
}

fn error_of(frame: &Frame) -> SessionFailure {
    SessionFailure::Protocol(frame.get("message").unwrap_or(&frame.body).to_owned())
}
