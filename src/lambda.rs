//! Translation between Lambda proxy events and WebSocket-over-HTTP sessions.

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use grip_core::{
    decode_websocket_events, encode_websocket_events, EventType, Meta, WebSocketContext,
    WebSocketEvent, CONTENT_TYPE,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config;
use crate::error::FaasError;

const META_PREFIX: &str = "meta-";
const SET_META_PREFIX: &str = "Set-Meta-";

/// Inbound API Gateway / Lambda proxy event (the fields we read).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub http_method: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub body: Option<String>,
}

/// Outbound Lambda proxy response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub is_base64_encoded: bool,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Decode a proxied WebSocket-over-HTTP request into a session context,
/// using `GRIP_PREFIX` for channel names.
pub fn get_websocket(event: &ProxyRequest) -> Result<WebSocketContext, FaasError> {
    get_websocket_with_prefix(event, config::grip_prefix())
}

pub fn get_websocket_with_prefix(
    event: &ProxyRequest,
    grip_prefix: impl Into<String>,
) -> Result<WebSocketContext, FaasError> {
    let headers: HashMap<String, &str> = event
        .headers
        .iter()
        .flatten()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect();

    let content_type = headers
        .get("content-type")
        .map(|ct| ct.split(';').next().unwrap_or_default().trim());
    if event.http_method != "POST" || content_type != Some(CONTENT_TYPE) {
        return Err(FaasError::NotWebSocketRequest);
    }

    let cid = headers.get("connection-id").map(|v| v.to_string());

    let meta: Meta = headers
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(META_PREFIX)
                .map(|name| (name.to_string(), v.to_string()))
        })
        .collect();

    let raw = event.body.as_deref().unwrap_or_default();
    let body = if event.is_base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| FaasError::InvalidBody(e.to_string()))?
    } else {
        raw.as_bytes().to_vec()
    };

    let events = decode_websocket_events(&body)?;
    debug!(
        connection_id = cid.as_deref().unwrap_or(""),
        events = events.len(),
        meta = meta.len(),
        "decoded websocket-over-http request"
    );

    Ok(WebSocketContext::new(cid, meta, events, grip_prefix))
}

/// Encode a session context as the proxy response.
pub fn websocket_to_response(ctx: &WebSocketContext) -> ProxyResponse {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), CONTENT_TYPE.to_string());
    if ctx.accepted {
        headers.insert("Sec-WebSocket-Extensions".to_string(), "grip".to_string());
    }

    for key in ctx.orig_meta.keys() {
        let kept = ctx.meta.keys().any(|k| k.to_lowercase() == *key);
        if !kept {
            headers.insert(format!("{SET_META_PREFIX}{key}"), String::new());
        }
    }
    for (key, value) in &ctx.meta {
        let name = key.to_lowercase();
        if ctx.orig_meta.get(&name) != Some(value) {
            headers.insert(format!("{SET_META_PREFIX}{name}"), value.clone());
        }
    }

    let mut events = Vec::with_capacity(ctx.out_events.len() + 2);
    if ctx.accepted {
        events.push(WebSocketEvent::new(EventType::Open));
    }
    events.extend(ctx.out_events.iter().cloned());
    if ctx.closed {
        events.push(WebSocketEvent::with_content(
            EventType::Close,
            ctx.out_close_code.to_be_bytes().to_vec(),
        ));
    }

    let body = encode_websocket_events(&events);
    ProxyResponse {
        is_base64_encoded: true,
        status_code: 200,
        headers,
        body: base64::engine::general_purpose::STANDARD.encode(&body),
    }
}

/// Lets handlers write `ctx.to_response()`.
pub trait ToProxyResponse {
    fn to_response(&self) -> ProxyResponse;
}

impl ToProxyResponse for WebSocketContext {
    fn to_response(&self) -> ProxyResponse {
        websocket_to_response(self)
    }
}
