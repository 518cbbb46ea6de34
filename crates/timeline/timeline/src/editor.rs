use std::sync::Arc;

use tracing::{info, instrument, warn};

use hedgeline_core::{
    AttachmentLink, EventId, Locale, Role, SubjectRef, TimelineEvent, UserMessage, Visibility,
    can_write_timeline, extract_mentions,
};

use crate::backend::TimelineBackend;
use crate::composer::upload_and_record;
use crate::error::ComposeError;
use crate::request::{FileUpload, NewCorrection};
use crate::window::EventWindow;

/// Staging area for a correction of one existing comment.
///
/// The editor is pre-populated from the newest loaded version of the
/// target. The correction always keeps the target's visibility; there is no
/// setter for it.
pub struct CorrectionEditor<B: TimelineBackend + ?Sized> {
    backend: Arc<B>,
    subject: SubjectRef,
    target_id: EventId,
    role: Role,
    locale: Locale,
    visibility: Visibility,
    body: String,
    attachments: Vec<AttachmentLink>,
    error: Option<UserMessage>,
}

impl<B: TimelineBackend + ?Sized> CorrectionEditor<B> {
    /// Open an editor for `target_id`, which must be a loaded comment
    /// (original or correction).
    pub fn open(
        window: &EventWindow<B>,
        target_id: EventId,
        role: Role,
        locale: Locale,
    ) -> Result<Self, ComposeError> {
        if !can_write_timeline(role) {
            return Err(ComposeError::NotAuthorized(role));
        }
        let target = window
            .get(target_id)
            .ok_or(ComposeError::TargetNotLoaded(target_id))?;
        if !target.event_type.is_comment() {
            return Err(ComposeError::NotCorrectable(target_id));
        }

        let current = current_version(window, target);
        let (body, attachments) = current
            .comment()
            .or_else(|| target.comment())
            .map(|c| (c.body.clone(), c.attachments.clone()))
            .unwrap_or_default();

        Ok(Self {
            backend: Arc::clone(window.backend()),
            subject: target.subject(),
            target_id,
            role,
            locale,
            visibility: target.visibility,
            body,
            attachments,
            error: None,
        })
    }

    pub fn set_body(&mut self, text: impl Into<String>) {
        self.body = text.into();
    }

    /// Upload a file and stage it on the correction. The attachment event
    /// takes the target's visibility.
    #[instrument(
        name = "correction.add_attachment",
        skip(self, file),
        fields(target = %self.target_id, file_name = %file.file_name)
    )]
    pub async fn add_attachment(&mut self, file: FileUpload) -> Result<(), ComposeError> {
        let uploaded =
            upload_and_record(self.backend.as_ref(), &self.subject, &file, self.visibility).await;
        match uploaded {
            Ok(attachment) => {
                self.error = None;
                self.attachments.push(AttachmentLink::Resolved(attachment));
                Ok(())
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

    pub fn remove_attachment(&mut self, attachment_event_id: EventId) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.attachment_event_id() != attachment_event_id);
        before != self.attachments.len()
    }

    /// Send the correction. Same validation, success and failure rules as
    /// [`Composer::submit`](crate::Composer::submit).
    #[instrument(name = "correction.submit", skip(self, window), fields(target = %self.target_id))]
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

        let request = NewCorrection {
            supersedes_event_id: self.target_id,
            body: self.body.clone(),
            mentions: extract_mentions(&self.body),
            attachments: self
                .attachments
                .iter()
                .map(AttachmentLink::attachment_event_id)
                .collect(),
        };

        match self.backend.create_correction(&request).await {
            Ok(event) => {
                info!(event_id = %event.id, "correction created");
                self.body.clear();
                self.attachments.clear();
                self.error = None;
                if let Err(e) = window.refetch().await {
                    warn!(error = %e, "refetch after correction failed");
                }
                Ok(event)
            }
            Err(source) => {
                warn!(error = %source, "correction submission failed");
                self.error = Some(UserMessage::CorrectionFailed);
                Err(ComposeError::Backend {
                    message: UserMessage::CorrectionFailed,
                    source,
                })
            }
        }
    }

    pub fn target_id(&self) -> EventId {
        self.target_id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Inherited from the target.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn attachments(&self) -> &[AttachmentLink] {
        &self.attachments
    }

    pub fn mentions(&self) -> Vec<String> {
        extract_mentions(&self.body)
    }

    pub fn error(&self) -> Option<UserMessage> {
        self.error
    }

    pub fn error_text(&self) -> Option<&'static str> {
        self.error.map(|m| m.text(self.locale))
    }
}

fn current_version<'a, B: TimelineBackend + ?Sized>(
    window: &'a EventWindow<B>,
    target: &'a TimelineEvent,
) -> &'a TimelineEvent {
    let latest = window.corrections().latest_version(target.id);
    window.get(latest).unwrap_or(target)
}
