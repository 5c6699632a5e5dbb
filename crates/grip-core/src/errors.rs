/// Errors raised while decoding events, driving a session context,
/// parsing GRIP URIs or exporting publish items.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GripError {
    // Wire format
    #[error("bad websocket-events format: {0}")]
    BadFormat(String),

    // Session
    #[error("read from empty buffer")]
    EmptyBuffer,
    #[error("client disconnected unexpectedly")]
    Disconnected,
    #[error("text message is not valid UTF-8")]
    InvalidUtf8,

    // Configuration
    #[error("invalid GRIP URI: {0}")]
    InvalidUri(String),
    #[error("invalid base64 key: {0}")]
    InvalidKey(String),

    // Publishing
    #[error("more than one instance of format '{0}' in item")]
    DuplicateFormat(&'static str),
}

impl GripError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::BadFormat(_) => "bad_format",
            Self::EmptyBuffer => "empty_buffer",
            Self::Disconnected => "disconnected",
            Self::InvalidUtf8 => "invalid_utf8",
            Self::InvalidUri(_) => "invalid_uri",
            Self::InvalidKey(_) => "invalid_key",
            Self::DuplicateFormat(_) => "duplicate_format",
        }
    }
}
