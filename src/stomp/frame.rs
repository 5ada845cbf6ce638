//! STOMP frame model and text codec.
//!
//! One frame travels in one WebSocket text message:
//!
//! ```text
//! COMMAND
//! header1:value1
//! header2:value2
//!
//! body^@
//! ```
//!
//! Header values are escaped (`\r`, `\n`, `:`, `\`) in every frame except
//! `CONNECT` and `CONNECTED`. A message made only of EOLs is a heart-beat.

use std::fmt;

use crate::error::GatewayError;

/// Frame terminator.
pub const NUL: char = '\0';

/// STOMP frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client → Server: open a session.
    Connect,
    /// Client → Server: open a session (STOMP 1.1+ alias of `CONNECT`).
    Stomp,
    /// Server → Client: session accepted.
    Connected,
    /// Client → Server: send a message to a destination.
    Send,
    /// Client → Server: subscribe to a destination.
    Subscribe,
    /// Client → Server: drop a subscription.
    Unsubscribe,
    /// Client → Server: acknowledge a message.
    Ack,
    /// Client → Server: reject a message.
    Nack,
    /// Client → Server: close the session.
    Disconnect,
    /// Server → Client: a message for a subscription.
    Message,
    /// Server → Client: a frame requesting a receipt was processed.
    Receipt,
    /// Server → Client: the session failed.
    Error,
}

impl Command {
    /// Returns the wire name of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parses a wire command name. Command names are case-sensitive.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        let command = match name {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => return None,
        };
        Some(command)
    }

    const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Lookups return the first occurrence.
    headers: Vec<(String, String)>,
    /// Frame body (text).
    pub body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Sets the body together with its `content-type` and `content-length`
    /// headers.
    #[must_use]
    pub fn with_body(self, content_type: &str, body: &str) -> Self {
        let mut frame = self
            .header("content-type", content_type)
            .header("content-length", &body.len().to_string());
        frame.body = body.to_owned();
        frame
    }

    /// Builds an `ERROR` frame with a short `message` header and a text body.
    #[must_use]
    pub fn error(message: &str, detail: &str) -> Self {
        Self::new(Command::Error)
            .header("message", message)
            .with_body("text/plain", detail)
    }

    /// Returns the value of the first header named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of a header the command cannot do without.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingHeader`] if the header is absent.
    pub fn require(&self, name: &str) -> Result<&str, GatewayError> {
        self.get(name)
            .ok_or_else(|| GatewayError::MissingHeader(name.to_owned()))
    }

    /// Returns the `receipt` header, if the client asked for a receipt.
    #[must_use]
    pub fn receipt(&self) -> Option<&str> {
        self.get("receipt")
    }

    /// Iterates over all headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serializes the frame to its wire text, including the NUL terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let escape_headers = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape_headers {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    /// Parses one frame from a WebSocket text message.
    ///
    /// Returns `Ok(None)` for a heart-beat (a message made only of EOLs).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidFrame`] when the command is unknown, a
    /// header line has no colon, a header uses an undefined escape, the
    /// `content-length` is wrong, or the NUL terminator is missing.
    pub fn parse(text: &str) -> Result<Option<Self>, GatewayError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let (command_line, mut rest) =
            next_line(text).ok_or_else(|| invalid("missing end of command line"))?;
        let command = Command::from_wire(command_line)
            .ok_or_else(|| invalid(format!("unknown command '{command_line}'")))?;
        let unescape_headers = command.escapes_headers();

        let mut frame = Self::new(command);
        loop {
            let (line, after) = next_line(rest).ok_or_else(|| invalid("unterminated headers"))?;
            rest = after;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| invalid(format!("header line without colon: '{line}'")))?;
            let (name, value) = if unescape_headers {
                (unescape(name)?, unescape(value)?)
            } else {
                (name.to_owned(), value.to_owned())
            };
            if frame.get(&name).is_none() {
                frame.headers.push((name, value));
            }
        }

        let body = match frame.get("content-length") {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("invalid content-length '{raw}'")))?;
                let body = rest
                    .get(..len)
                    .ok_or_else(|| invalid("body shorter than content-length"))?;
                let tail = rest.get(len..).unwrap_or_default();
                if !tail.starts_with(NUL) {
                    return Err(invalid("missing NUL terminator after body"));
                }
                body
            }
            None => rest
                .split_once(NUL)
                .map(|(body, _)| body)
                .ok_or_else(|| invalid("missing NUL terminator"))?,
        };
        frame.body = body.to_owned();

        Ok(Some(frame))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for (name, value) in &self.headers {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> GatewayError {
    GatewayError::InvalidFrame(reason.into())
}

/// Splits off one line, accepting both `\n` and `\r\n` endings.
fn next_line(text: &str) -> Option<(&str, &str)> {
    text.split_once('\n')
        .map(|(line, rest)| (line.strip_suffix('\r').unwrap_or(line), rest))
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            _ => out.push(c),
        }
    }
}

fn unescape(raw: &str) -> Result<String, GatewayError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                return Err(invalid(format!("undefined escape sequence '\\{other}'")));
            }
            None => return Err(invalid("dangling escape at end of header")),
        }
    }
    Ok(out)
}
