use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use hedgeline_core::{
    AttachmentRef, EventId, Locale, Role, SubjectRef, TimelineEvent, UserMessage, Visibility,
    can_use_finance_visibility, can_write_timeline, extract_mentions,
};

use crate::backend::TimelineBackend;
use crate::error::{BackendError, ComposeError};
use crate::request::{FileUpload, NewAttachment, NewComment};
use crate::window::EventWindow;

/// Staging area for a new human comment on one subject.
///
/// Nothing reaches the backend until [`submit`](Self::submit), except
/// attachments, which are uploaded as soon as they are added.
pub struct Composer<B: TimelineBackend + ?Sized> {
    backend: Arc<B>,
    subject: SubjectRef,
    role: Role,
    locale: Locale,
    body: String,
    visibility: Visibility,
    attachments: Vec<AttachmentRef>,
    error: Option<UserMessage>,
}

impl<B: TimelineBackend + ?Sized> Composer<B> {
    pub fn new(backend: Arc<B>, subject: SubjectRef, role: Role, locale: Locale) -> Self {
        Self {
            backend,
            subject,
            role,
            locale,
            body: String::new(),
            visibility: Visibility::All,
            attachments: Vec::new(),
            error: None,
        }
    }

    pub fn set_body(&mut self, text: impl Into<String>) {
        self.body = text.into();
    }

    /// Finance visibility requires the finance capability.
    pub fn set_visibility(&mut self, visibility: Visibility) -> Result<(), ComposeError> {
        check_visibility(self.role, visibility)?;
        self.visibility = visibility;
        Ok(())
    }

    /// Upload a file and stage the resulting attachment.
    ///
    /// On failure the staged attachments are left unchanged and the error
    /// flag is set.
    #[instrument(
        name = "composer.add_attachment",
        skip(self, file),
        fields(subject = %self.subject, file_name = %file.file_name, size = file.size())
    )]
    pub async fn add_attachment(
        &mut self,
        file: FileUpload,
        visibility: Visibility,
    ) -> Result<&AttachmentRef, ComposeError> {
        if !can_write_timeline(self.role) {
            return Err(ComposeError::NotAuthorized(self.role));
        }
        check_visibility(self.role, visibility)?;

        match upload_and_record(self.backend.as_ref(), &self.subject, &file, visibility).await {
            Ok(attachment) => {
                debug!(attachment_event_id = %attachment.attachment_event_id, "attachment staged");
                self.error = None;
                self.attachments.push(attachment);
                Ok(&self.attachments[self.attachments.len() - 1])
            }
            Err(source) => {
                warn!(error = %source, "attachment upload failed");
                self.error = Some(UserMessage::UploadFailed);
                Err(ComposeError::Backend {
                    message: UserMessage::UploadFailed,
                    source,
                })
            }
        }
    }

    /// Unstage an attachment. The attachment event stays in the log.
    pub fn remove_attachment(&mut self, attachment_event_id: EventId) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.attachment_event_id != attachment_event_id);
        before != self.attachments.len()
    }

    /// Send the staged comment.
    ///
    /// An empty body or a caller without write capability is rejected
    /// before any request is made, leaving the staged state untouched. On
    /// success the staged state is cleared and `window` is refetched; on
    /// failure the staged state is kept and the error flag is set. There is
    /// no automatic retry.
    #[instrument(name = "composer.submit", skip(self, window), fields(subject = %self.subject))]
    pub async fn submit(
        &mut self,
        window: &mut EventWindow<B>,
    ) -> Result<TimelineEvent, ComposeError> {
        if self.body.trim().is_empty() {
            return Err(ComposeError::EmptyBody);
        }
        if !can_write_timeline(self.role) {
            return Err(ComposeError::NotAuthorized(self.role));
        }

        let request = NewComment {
            subject_type: self.subject.subject_type.clone(),
            subject_id: self.subject.subject_id.clone(),
            body: self.body.clone(),
            visibility: self.visibility,
            mentions: extract_mentions(&self.body),
            attachments: self
                .attachments
                .iter()
                .map(|a| a.attachment_event_id)
                .collect(),
        };

        match self.backend.create_comment(&request).await {
            Ok(event) => {
                info!(event_id = %event.id, "comment created");
                self.clear();
                if let Err(e) = window.refetch().await {
                    warn!(error = %e, "refetch after comment failed");
                }
                Ok(event)
            }
            Err(source) => {
                warn!(error = %source, "comment submission failed");
                self.error = Some(UserMessage::SubmitFailed);
                Err(ComposeError::Backend {
                    message: UserMessage::SubmitFailed,
                    source,
                })
            }
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// Raw `@` tokens in the current body.
    pub fn mentions(&self) -> Vec<String> {
        extract_mentions(&self.body)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn subject(&self) -> &SubjectRef {
        &self.subject
    }

    pub fn error(&self) -> Option<UserMessage> {
        self.error
    }

    /// Localized text of the current error flag.
    pub fn error_text(&self) -> Option<&'static str> {
        self.error.map(|m| m.text(self.locale))
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn clear(&mut self) {
        self.body.clear();
        self.visibility = Visibility::All;
        self.attachments.clear();
        self.error = None;
    }
}

pub(crate) fn check_visibility(role: Role, visibility: Visibility) -> Result<(), ComposeError> {
    if visibility == Visibility::Finance && !can_use_finance_visibility(role) {
        return Err(ComposeError::FinanceVisibilityNotAllowed(role));
    }
    Ok(())
}

/// Upload `file`, then append its attachment event.
pub(crate) async fn upload_and_record<B: TimelineBackend + ?Sized>(
    backend: &B,
    subject: &SubjectRef,
    file: &FileUpload,
    visibility: Visibility,
) -> Result<AttachmentRef, BackendError> {
    let uploaded = backend.upload_file(subject, file).await?;
    let request = NewAttachment {
        subject_type: subject.subject_type.clone(),
        subject_id: subject.subject_id.clone(),
        file: uploaded.clone(),
        visibility,
    };
    let event = backend.create_attachment_event(&request).await?;
    Ok(AttachmentRef::from_event(&event)
        .unwrap_or_else(|| AttachmentRef::from_upload(event.id, uploaded)))
}
