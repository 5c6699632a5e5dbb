use grip_core::GripError;
use grip_pubcontrol::PublishError;

#[derive(Debug, thiserror::Error)]
pub enum FaasError {
    #[error("request does not seem to be a websocket-over-http request")]
    NotWebSocketRequest,

    #[error("request body is not valid base64: {0}")]
    InvalidBody(String),

    #[error("invalid GRIP configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Grip(#[from] GripError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
