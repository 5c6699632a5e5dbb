//! GRIP WebSocket-over-HTTP support for serverless HTTP handlers.
//!
//! A handler decodes the proxied request with [`get_websocket`], drives the
//! returned [`WebSocketContext`], and returns `ctx.to_response()`. Messages
//! for subscribed connections go out through [`publish`].

pub mod config;
pub mod error;
pub mod lambda;
pub mod shared;

pub use error::FaasError;
pub use grip_core::{
    Format, GripError, Item, Meta, Payload, Received, WebSocketContext, WebSocketEvent,
};
pub use lambda::{
    get_websocket, get_websocket_with_prefix, websocket_to_response, ProxyRequest, ProxyResponse,
    ToProxyResponse,
};
pub use shared::{finish, get_pubcontrol, publish, publish_with_callback};
