use thiserror::Error;

/// Errors raised by the library and provider clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited by {0}")]
    RateLimited(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),
}

impl ClientError {
    /// Fatal errors abort the whole run; everything else only fails the
    /// show being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Connection(_) | ClientError::Auth(_))
    }

    /// Maps a transport error, promoting connect failures to `Connection`.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else {
            ClientError::Request(err)
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
