pub mod context;
pub mod errors;
pub mod events;
pub mod item;
pub mod uri;

pub use context::{control_message, Meta, Received, WebSocketContext};
pub use errors::GripError;
pub use events::{
    decode_websocket_events, encode_websocket_events, EventType, WebSocketEvent, CONTENT_TYPE,
};
pub use item::{Format, HttpResponseFormat, HttpStreamFormat, Item, Payload, WebSocketMessageFormat};
pub use uri::{parse_grip_uri, ControlKey, GripProxy};
