use grip_core::GripError;

#[derive(Clone, Debug, thiserror::Error)]
pub enum PublishError {
    #[error("item error: {0}")]
    Item(#[from] GripError),

    #[error("failed to sign token: {0}")]
    Auth(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("received failed status code {status} with message: {body}")]
    Status { status: u16, body: String },

    #[error("no async runtime available for background publish")]
    NoRuntime,
}

impl PublishError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::Auth(_) => "auth",
            Self::ClientBuild(_) => "client_build",
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::NoRuntime => "no_runtime",
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        PublishError::Network(e.to_string())
    }
}
