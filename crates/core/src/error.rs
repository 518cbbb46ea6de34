use thiserror::Error;

/// Errors raised when parsing core vocabulary values from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown visibility: {0}")]
    UnknownVisibility(String),

    #[error("unknown locale: {0}")]
    UnknownLocale(String),
}
