use async_trait::async_trait;

use hedgeline_core::{AttachmentRef, EventId, SubjectRef, TimelineEvent, UploadedFile};

use crate::error::BackendError;
use crate::request::{
    DownloadedFile, EventPage, EventQuery, FileUpload, NewAttachment, NewComment, NewCorrection,
};

/// Source of truth for subject timelines.
///
/// The log is append-only: implementations create events and never update
/// or delete them. Pages are returned oldest first with strictly increasing
/// ids. Implementations must be `Send + Sync` to be shared across async
/// tasks.
#[async_trait]
pub trait TimelineBackend: Send + Sync {
    /// Fetch one page of events for a subject.
    async fn list_events(&self, query: &EventQuery) -> Result<EventPage, BackendError>;

    /// Append a human comment.
    async fn create_comment(&self, request: &NewComment) -> Result<TimelineEvent, BackendError>;

    /// Append a correction of an earlier comment.
    async fn create_correction(
        &self,
        request: &NewCorrection,
    ) -> Result<TimelineEvent, BackendError>;

    /// Store a file and return its metadata. Creates no timeline event.
    async fn upload_file(
        &self,
        subject: &SubjectRef,
        file: &FileUpload,
    ) -> Result<UploadedFile, BackendError>;

    /// Append the `human.attachment.added` event for an uploaded file.
    async fn create_attachment_event(
        &self,
        request: &NewAttachment,
    ) -> Result<TimelineEvent, BackendError>;

    /// Metadata of an attachment by the id of the event that introduced it.
    async fn attachment_metadata(
        &self,
        attachment_event_id: EventId,
    ) -> Result<Option<AttachmentRef>, BackendError>;

    /// Download the content of an attachment.
    async fn download_attachment(
        &self,
        attachment_event_id: EventId,
    ) -> Result<DownloadedFile, BackendError>;
}
