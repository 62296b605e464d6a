use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    /// Non-2xx answer from a remote service. `status` is the upstream HTTP status.
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Blocked host: {0}")]
    Blocked(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Rewrite error: {0}")]
    Rewrite(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Timeouts and transport failures may succeed when retried; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Network(_))
    }

    /// Upstream HTTP status carried by the error, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status code used when the error crosses an HTTP boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Blocked(_) => 403,
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
