//! Client error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
///
/// Every failure of a single API call surfaces as exactly one of these.
/// Only throttling is absorbed internally (up to the configured retry bound);
/// everything else is returned to the caller as-is.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Payload could not be serialized into query parameters or form parts
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Payload stream could not be read or rewound
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Endpoint base or request path did not resolve to a URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Network-level failure; not retried by the client
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server rejected the request parameters (HTTP 400)
    #[error("request validation error: {message}")]
    Validation { message: String },

    /// Server refused the request (HTTP 403)
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Uploaded file exceeds the server's size limit (HTTP 413)
    #[error("file is too large")]
    FileTooLarge,

    /// Server kept throttling (HTTP 429) after the retry budget ran out
    #[error("request throttled after {attempts} attempts")]
    Throttled { attempts: u32 },

    /// Success body was not the expected JSON
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Caller cancelled the call
    #[error("request was cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether repeating the whole call later may succeed.
    ///
    /// Throttling and network failures are transient; rejections by the
    /// server (validation, forbidden, size limit) will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::Transport(_))
    }

    /// Message passed through from the server, if the error carries one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Validation { message } | Self::Forbidden { message } => Some(message),
            _ => None,
        }
    }
}
