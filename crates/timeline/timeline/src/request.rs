use bytes::Bytes;
use serde::{Deserialize, Serialize};

use hedgeline_core::{
    EventId, SubjectId, SubjectRef, SubjectType, TimelineEvent, UploadedFile, Visibility,
};

/// Default page size when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Largest page the window will ask for.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Query for one page of a subject's timeline, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub subject_type: SubjectType,
    pub subject_id: SubjectId,
    pub limit: u32,
    /// Return only events with an id greater than this cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<EventId>,
}

impl EventQuery {
    pub fn first_page(subject: &SubjectRef, limit: u32) -> Self {
        Self {
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            limit: effective_limit(limit),
            after_id: None,
        }
    }

    #[must_use]
    pub fn after(mut self, after_id: Option<EventId>) -> Self {
        self.after_id = after_id;
        self
    }

    pub fn subject(&self) -> SubjectRef {
        SubjectRef::new(self.subject_type.clone(), self.subject_id.clone())
    }
}

/// Clamp a requested page size to `1..=MAX_PAGE_SIZE`; zero means default.
pub fn effective_limit(limit: u32) -> u32 {
    if limit == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

/// One page of events plus the server's continuation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<TimelineEvent>,
    #[serde(default)]
    pub has_more: bool,
}

/// Body of the create-comment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub subject_type: SubjectType,
    pub subject_id: SubjectId,
    pub body: String,
    pub visibility: Visibility,
    pub mentions: Vec<String>,
    /// Attachment event ids.
    pub attachments: Vec<EventId>,
}

/// Body of the create-correction request. Visibility is inherited from the
/// corrected event on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCorrection {
    pub supersedes_event_id: EventId,
    pub body: String,
    pub mentions: Vec<String>,
    pub attachments: Vec<EventId>,
}

/// Body of the create-attachment-event request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttachment {
    pub subject_type: SubjectType,
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub file: UploadedFile,
    pub visibility: Visibility,
}

/// A local file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Content of a downloaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}
