//! Publish items and their transport formats.

use std::collections::BTreeMap;

use base64::Engine;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::errors::GripError;

/// Payload that may be sent as text or as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Insert under `key`, or under `key-bin` as base64 for binary data.
    fn export_into(&self, out: &mut Map<String, Value>, key: &str) {
        match self {
            Self::Text(text) => {
                out.insert(key.to_string(), Value::String(text.clone()));
            }
            Self::Binary(bytes) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                out.insert(format!("{key}-bin"), Value::String(encoded));
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(b))
    }
}

/// A full HTTP response for long-polling subscribers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponseFormat {
    pub code: Option<u16>,
    pub reason: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Payload>,
}

/// A chunk appended to (or the end of) an HTTP stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpStreamFormat {
    Content(Payload),
    Close,
}

/// A message delivered to WebSocket subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebSocketMessageFormat {
    Content(Payload),
    Close { code: Option<u16> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Format {
    HttpResponse(HttpResponseFormat),
    HttpStream(HttpStreamFormat),
    WebSocketMessage(WebSocketMessageFormat),
}

impl Format {
    /// Key under which the format appears in an exported item.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HttpResponse(_) => "http-response",
            Self::HttpStream(_) => "http-stream",
            Self::WebSocketMessage(_) => "ws-message",
        }
    }

    pub fn export(&self) -> Value {
        let mut out = Map::new();
        match self {
            Self::HttpResponse(resp) => {
                if let Some(code) = resp.code {
                    out.insert("code".into(), Value::from(code));
                }
                if let Some(reason) = &resp.reason {
                    out.insert("reason".into(), Value::String(reason.clone()));
                }
                if !resp.headers.is_empty() {
                    let headers = resp
                        .headers
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect();
                    out.insert("headers".into(), Value::Object(headers));
                }
                if let Some(body) = &resp.body {
                    body.export_into(&mut out, "body");
                }
            }
            Self::HttpStream(HttpStreamFormat::Content(content))
            | Self::WebSocketMessage(WebSocketMessageFormat::Content(content)) => {
                content.export_into(&mut out, "content");
            }
            Self::HttpStream(HttpStreamFormat::Close) => {
                out.insert("action".into(), Value::String("close".into()));
            }
            Self::WebSocketMessage(WebSocketMessageFormat::Close { code }) => {
                out.insert("action".into(), Value::String("close".into()));
                if let Some(code) = code {
                    out.insert("code".into(), Value::from(*code));
                }
            }
        }
        Value::Object(out)
    }

    pub fn ws_message(content: impl Into<Payload>) -> Self {
        Self::WebSocketMessage(WebSocketMessageFormat::Content(content.into()))
    }

    pub fn http_stream(content: impl Into<Payload>) -> Self {
        Self::HttpStream(HttpStreamFormat::Content(content.into()))
    }
}

/// One publish unit: the same message in one or more formats.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Item {
    pub formats: Vec<Format>,
    pub id: Option<String>,
    pub prev_id: Option<String>,
    pub meta: Option<Map<String, Value>>,
}

impl Item {
    pub fn new(formats: Vec<Format>) -> Self {
        Self {
            formats,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_prev_id(mut self, prev_id: impl Into<String>) -> Self {
        self.prev_id = Some(prev_id.into());
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// JSON form for the publish endpoint, with `channel` set.
    pub fn export(&self, channel: &str) -> Result<Value, GripError> {
        let mut out = Map::new();
        out.insert("channel".into(), Value::String(channel.to_string()));
        if let Some(id) = &self.id {
            out.insert("id".into(), Value::String(id.clone()));
        }
        if let Some(prev_id) = &self.prev_id {
            out.insert("prev-id".into(), Value::String(prev_id.clone()));
        }
        if let Some(meta) = &self.meta {
            if !meta.is_empty() {
                out.insert("meta".into(), Value::Object(meta.clone()));
            }
        }
        for format in &self.formats {
            let name = format.name();
            if out.contains_key(name) {
                return Err(GripError::DuplicateFormat(name));
            }
            out.insert(name.to_string(), format.export());
        }
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ws_message_text_and_binary() {
        assert_eq!(Format::ws_message("hi").export(), json!({"content": "hi"}));
        assert_eq!(
            Format::ws_message(vec![0u8, 1, 2]).export(),
            json!({"content-bin": "AAEC"})
        );
    }

    #[test]
    fn close_actions() {
        let ws = Format::WebSocketMessage(WebSocketMessageFormat::Close { code: Some(1000) });
        assert_eq!(ws.export(), json!({"action": "close", "code": 1000}));
        let stream = Format::HttpStream(HttpStreamFormat::Close);
        assert_eq!(stream.export(), json!({"action": "close"}));
    }

    #[test]
    fn http_response_fields() {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        let format = Format::HttpResponse(HttpResponseFormat {
            code: Some(200),
            reason: Some("OK".into()),
            headers,
            body: Some("done\n".into()),
        });
        assert_eq!(
            format.export(),
            json!({
                "code": 200,
                "reason": "OK",
                "headers": {"Content-Type": "text/plain"},
                "body": "done\n"
            })
        );
    }

    #[test]
    fn item_export_includes_ids_and_meta() {
        let mut meta = Map::new();
        meta.insert("sender".into(), json!("bot"));
        let item = Item::new(vec![Format::ws_message("x"), Format::http_stream("y")])
            .with_id("2")
            .with_prev_id("1")
            .with_meta(meta);
        assert_eq!(
            item.export("room").unwrap(),
            json!({
                "channel": "room",
                "id": "2",
                "prev-id": "1",
                "meta": {"sender": "bot"},
                "ws-message": {"content": "x"},
                "http-stream": {"content": "y"}
            })
        );
    }

    #[test]
    fn duplicate_format_is_rejected() {
        let item = Item::new(vec![Format::ws_message("a"), Format::ws_message("b")]);
        assert_eq!(
            item.export("c").unwrap_err(),
            GripError::DuplicateFormat("ws-message")
        );
    }
}
