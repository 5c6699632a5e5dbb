use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{json, Value};

use crate::errors::GripError;
use crate::events::{EventType, WebSocketEvent};

/// Connection metadata, keyed by lowercase name.
pub type Meta = BTreeMap<String, String>;

const MESSAGE_PREFIX: &[u8] = b"m:";
const CONTROL_PREFIX: &[u8] = b"c:";

/// A message taken off the inbound event queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Received {
    Text(String),
    Binary(Bytes),
    /// Peer closed; carries the close code when the client sent one.
    Close(Option<u16>),
}

/// State of one WebSocket-over-HTTP exchange: the events the proxy sent us
/// and the events, metadata changes and accept/close decisions to send back.
#[derive(Clone, Debug)]
pub struct WebSocketContext {
    pub id: Option<String>,
    pub orig_meta: Meta,
    pub meta: Meta,
    pub in_events: Vec<WebSocketEvent>,
    pub read_index: usize,
    pub accepted: bool,
    pub close_code: Option<u16>,
    pub closed: bool,
    pub out_close_code: u16,
    pub out_events: Vec<WebSocketEvent>,
    grip_prefix: String,
}

impl WebSocketContext {
    pub fn new(
        id: Option<String>,
        meta: Meta,
        in_events: Vec<WebSocketEvent>,
        grip_prefix: impl Into<String>,
    ) -> Self {
        Self {
            id,
            orig_meta: meta.clone(),
            meta,
            in_events,
            read_index: 0,
            accepted: false,
            close_code: None,
            closed: false,
            out_close_code: 0,
            out_events: Vec::new(),
            grip_prefix: grip_prefix.into(),
        }
    }

    pub fn grip_prefix(&self) -> &str {
        &self.grip_prefix
    }

    pub fn is_opening(&self) -> bool {
        self.in_events
            .first()
            .is_some_and(|e| e.kind == EventType::Open)
    }

    pub fn accept(&mut self) {
        self.accepted = true;
    }

    /// Close the connection, with code 0 when none is given.
    pub fn close(&mut self, code: Option<u16>) {
        self.closed = true;
        self.out_close_code = code.unwrap_or(0);
    }

    pub fn disconnect(&mut self) {
        self.out_events.push(WebSocketEvent::new(EventType::Disconnect));
    }

    pub fn can_recv(&self) -> bool {
        self.in_events
            .iter()
            .skip(self.read_index)
            .any(|e| e.kind.is_readable())
    }

    /// Take the next message. Pings passed over are answered with pongs.
    pub fn recv(&mut self) -> Result<Received, GripError> {
        let mut found = None;
        while found.is_none() && self.read_index < self.in_events.len() {
            let event = &self.in_events[self.read_index];
            if event.kind.is_readable() {
                found = Some(event.clone());
            } else if event.kind == EventType::Ping {
                self.out_events.push(WebSocketEvent::new(EventType::Pong));
            }
            self.read_index += 1;
        }

        let event = found.ok_or(GripError::EmptyBuffer)?;
        match event.kind {
            EventType::Text => {
                let text = std::str::from_utf8(event.content_bytes())
                    .map_err(|_| GripError::InvalidUtf8)?;
                Ok(Received::Text(text.to_string()))
            }
            EventType::Binary => Ok(Received::Binary(event.content.unwrap_or_default())),
            EventType::Close => {
                let code = match event.content_bytes() {
                    [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
                    _ => None,
                };
                if code.is_some() {
                    self.close_code = code;
                }
                Ok(Received::Close(code))
            }
            _ => Err(GripError::Disconnected),
        }
    }

    pub fn send(&mut self, message: &str) {
        self.out_events.push(WebSocketEvent::with_content(
            EventType::Text,
            prefixed(MESSAGE_PREFIX, message.as_bytes()),
        ));
    }

    pub fn send_binary(&mut self, message: &[u8]) {
        self.out_events.push(WebSocketEvent::with_content(
            EventType::Binary,
            prefixed(MESSAGE_PREFIX, message),
        ));
    }

    pub fn send_control(&mut self, message: &str) {
        self.out_events.push(WebSocketEvent::with_content(
            EventType::Text,
            prefixed(CONTROL_PREFIX, message.as_bytes()),
        ));
    }

    /// Subscribe the connection to `channel` (prefix applied).
    pub fn subscribe(&mut self, channel: &str) {
        let msg = control_message("subscribe", Some(self.prefixed_channel(channel)));
        self.send_control(&msg);
    }

    pub fn unsubscribe(&mut self, channel: &str) {
        let msg = control_message("unsubscribe", Some(self.prefixed_channel(channel)));
        self.send_control(&msg);
    }

    pub fn detach(&mut self) {
        let msg = control_message("detach", None);
        self.send_control(&msg);
    }

    fn prefixed_channel(&self, channel: &str) -> String {
        format!("{}{}", self.grip_prefix, channel)
    }
}

fn prefixed(prefix: &[u8], payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(prefix.len() + payload.len());
    buf.put_slice(prefix);
    buf.put_slice(payload);
    buf.freeze()
}

/// JSON body of a GRIP control message.
pub fn control_message(kind: &str, channel: Option<String>) -> String {
    let mut out = json!({ "type": kind });
    if let (Some(channel), Value::Object(map)) = (channel, &mut out) {
        map.insert("channel".into(), Value::String(channel));
    }
    out.to_string()
}
