//! WebSocket events and the `application/websocket-events` wire format.
//!
//! Each event is a header line `TYPE\r\n`, or `TYPE <hex-len>\r\n` followed
//! by exactly `hex-len` bytes of content and a closing `\r\n`.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::errors::GripError;

pub const CONTENT_TYPE: &str = "application/websocket-events";

const CRLF: &[u8] = b"\r\n";

/// Kind of a WebSocket-over-HTTP event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Open,
    Text,
    Binary,
    Ping,
    Pong,
    Close,
    Disconnect,
    /// A type this crate does not know; kept so newer proxies still decode.
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "OPEN",
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Close => "CLOSE",
            Self::Disconnect => "DISCONNECT",
            Self::Other(name) => name,
        }
    }

    /// Whether `recv` stops at this event.
    pub fn is_readable(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::Binary | Self::Close | Self::Disconnect
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "TEXT" => Ok(Self::Text),
            "BINARY" => Ok(Self::Binary),
            "PING" => Ok(Self::Ping),
            "PONG" => Ok(Self::Pong),
            "CLOSE" => Ok(Self::Close),
            "DISCONNECT" => Ok(Self::Disconnect),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

/// A single WebSocket event with optional payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebSocketEvent {
    pub kind: EventType,
    pub content: Option<Bytes>,
}

impl WebSocketEvent {
    pub fn new(kind: EventType) -> Self {
        Self {
            kind,
            content: None,
        }
    }

    pub fn with_content(kind: EventType, content: impl Into<Bytes>) -> Self {
        Self {
            kind,
            content: Some(content.into()),
        }
    }

    /// Payload bytes, empty when the event carries none.
    pub fn content_bytes(&self) -> &[u8] {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Serialize events into a websocket-events body.
pub fn encode_websocket_events(events: &[WebSocketEvent]) -> Bytes {
    let mut out = BytesMut::new();
    for event in events {
        out.put_slice(event.kind.as_str().as_bytes());
        if let Some(content) = &event.content {
            out.put_slice(format!(" {:x}", content.len()).as_bytes());
            out.put_slice(CRLF);
            out.put_slice(content);
        }
        out.put_slice(CRLF);
    }
    out.freeze()
}

/// Parse a websocket-events body.
pub fn decode_websocket_events(body: &[u8]) -> Result<Vec<WebSocketEvent>, GripError> {
    let mut events = Vec::new();
    let mut start = 0;

    while start < body.len() {
        let line_end = find_crlf(&body[start..])
            .map(|at| start + at)
            .ok_or_else(|| GripError::BadFormat("missing line terminator".into()))?;
        let header = std::str::from_utf8(&body[start..line_end])
            .map_err(|_| GripError::BadFormat("event header is not ASCII".into()))?;
        start = line_end + CRLF.len();

        let event = match header.split_once(' ') {
            Some((name, len)) => {
                let kind = parse_kind(name)?;
                let len = parse_hex_len(len)?;
                let end = start
                    .checked_add(len)
                    .filter(|end| *end <= body.len())
                    .ok_or_else(|| GripError::BadFormat("content shorter than declared".into()))?;
                let content = Bytes::copy_from_slice(&body[start..end]);
                if body.get(end..end + CRLF.len()) != Some(CRLF) {
                    return Err(GripError::BadFormat("missing content terminator".into()));
                }
                start = end + CRLF.len();
                WebSocketEvent::with_content(kind, content)
            }
            None => WebSocketEvent::new(parse_kind(header)?),
        };
        events.push(event);
    }

    debug!(count = events.len(), bytes = body.len(), "decoded websocket events");
    Ok(events)
}

fn parse_kind(name: &str) -> Result<EventType, GripError> {
    if name.is_empty() {
        return Err(GripError::BadFormat("empty event type".into()));
    }
    Ok(name.parse::<EventType>().unwrap_or_else(|never| match never {}))
}

/// Content length: one or more hex digits, no sign or whitespace.
fn parse_hex_len(len: &str) -> Result<usize, GripError> {
    let bad = || GripError::BadFormat(format!("bad content length '{len}'"));
    if len.is_empty() || !len.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad());
    }
    usize::from_str_radix(len, 16).map_err(|_| bad())
}

fn find_crlf(haystack: &[u8]) -> Option<usize> {
    haystack.windows(CRLF.len()).position(|w| w == CRLF)
}
