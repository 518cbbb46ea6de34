use hedgeline_core::{EventId, Locale, UserMessage};

/// Errors returned by a [`TimelineBackend`](crate::TimelineBackend).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response (network, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend refused the caller (401/403).
    #[error("not authorized (HTTP {status}): {detail}")]
    Unauthorized { status: u16, detail: String },

    /// Any other non-success response.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Build the error matching an HTTP status code.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if status == 401 || status == 403 {
            Self::Unauthorized { status, detail }
        } else {
            Self::Http { status, detail }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidResponse(_) => None,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Unauthorized { detail, .. } | Self::Http { detail, .. } => detail,
            Self::Transport(detail) | Self::InvalidResponse(detail) => detail,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Read failure of an [`EventWindow`](crate::EventWindow).
///
/// Keeps the detail and status so the caller can show a retry-capable
/// error state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load timeline: {detail}")]
pub struct WindowError {
    pub detail: String,
    pub status: Option<u16>,
}

impl WindowError {
    pub fn message(&self, locale: Locale) -> &'static str {
        UserMessage::LoadFailed.text(locale)
    }
}

impl From<BackendError> for WindowError {
    fn from(err: BackendError) -> Self {
        Self {
            status: err.status(),
            detail: err.detail().to_owned(),
        }
    }
}

/// Failures of the composer and the correction editor.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("comment body is empty")]
    EmptyBody,

    #[error("role {0} may not write to the timeline")]
    NotAuthorized(hedgeline_core::Role),

    #[error("role {0} may not use finance visibility")]
    FinanceVisibilityNotAllowed(hedgeline_core::Role),

    #[error("event {0} is not a comment")]
    NotCorrectable(EventId),

    #[error("event {0} is not in the loaded window")]
    TargetNotLoaded(EventId),

    /// The backend call failed. `message` is what the user sees.
    #[error("{message:?}: {source}")]
    Backend {
        message: UserMessage,
        #[source]
        source: BackendError,
    },
}

impl ComposeError {
    /// The generic message shown to end users; never the raw detail.
    pub fn user_message(&self) -> UserMessage {
        match self {
            Self::EmptyBody => UserMessage::EmptyBody,
            Self::NotAuthorized(_) => UserMessage::NotAuthorized,
            Self::FinanceVisibilityNotAllowed(_) => UserMessage::FinanceVisibilityNotAllowed,
            Self::NotCorrectable(_) | Self::TargetNotLoaded(_) => UserMessage::NotCorrectable,
            Self::Backend { source, .. } if source.is_authorization() => UserMessage::NotAuthorized,
            Self::Backend { message, .. } => *message,
        }
    }

    pub fn message(&self, locale: Locale) -> &'static str {
        self.user_message().text(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_authorization() {
        assert!(BackendError::from_status(403, "forbidden").is_authorization());
        assert!(!BackendError::from_status(500, "boom").is_authorization());
        assert_eq!(BackendError::from_status(404, "gone").status(), Some(404));
    }

    #[test]
    fn window_error_keeps_detail_and_status() {
        let err = WindowError::from(BackendError::from_status(502, "upstream down"));
        assert_eq!(err.status, Some(502));
        assert_eq!(err.detail, "upstream down");
        assert_eq!(err.message(Locale::En), UserMessage::LoadFailed.text(Locale::En));
    }

    #[test]
    fn backend_failures_show_generic_message() {
        let err = ComposeError::Backend {
            message: UserMessage::SubmitFailed,
            source: BackendError::Transport("connection reset by peer".into()),
        };
        assert_eq!(err.user_message(), UserMessage::SubmitFailed);
        assert!(!err.message(Locale::En).contains("connection reset"));

        let denied = ComposeError::Backend {
            message: UserMessage::SubmitFailed,
            source: BackendError::from_status(401, "token expired"),
        };
        assert_eq!(denied.user_message(), UserMessage::NotAuthorized);
    }
}
