//! HTTP publishing to GRIP proxies.

pub mod auth;
pub mod client;
pub mod error;
pub mod pubcontrol;

pub use auth::JwtAuth;
pub use client::PubControlClient;
pub use error::PublishError;
pub use pubcontrol::GripPubControl;
