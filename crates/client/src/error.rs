//! Error types for the Hedgeline client.

use thiserror::Error;

use hedgeline_timeline::BackendError;

/// Errors that can occur when using the Hedgeline client.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error (network failure, DNS resolution, timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// Non-success response. `message` is the `detail` of the error body
    /// when the server sent one.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Response deserialization error.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns `true` if this error is retryable.
    ///
    /// Connection errors and HTTP 5xx errors return `true`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Deserialization(_) | Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns the HTTP status if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Error> for BackendError {
    fn from(err: Error) -> Self {
        match err {
            Error::Connection(detail) | Error::Configuration(detail) => Self::Transport(detail),
            Error::Http { status, message } => Self::from_status(status, message),
            Error::Deserialization(detail) => Self::InvalidResponse(detail),
        }
    }
}
