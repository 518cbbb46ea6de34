use serde::{Deserialize, Serialize};

use crate::event::{EventPayload, TimelineEvent};
use crate::types::EventId;

/// Metadata returned by the upload endpoint for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: String,
    pub file_name: String,
    pub mime: String,
    pub size: u64,
    pub storage_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// A file attached to a timeline.
///
/// The attachment is owned by the `human.attachment.added` event that
/// introduced it; comments refer to it through `attachment_event_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub attachment_event_id: EventId,
    pub file_id: String,
    pub file_name: String,
    pub mime: String,
    pub size: u64,
    pub storage_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl AttachmentRef {
    /// Build a reference from the event that introduced the attachment.
    pub fn from_upload(attachment_event_id: EventId, file: UploadedFile) -> Self {
        Self {
            attachment_event_id,
            file_id: file.file_id,
            file_name: file.file_name,
            mime: file.mime,
            size: file.size,
            storage_uri: file.storage_uri,
            checksum: file.checksum,
        }
    }

    /// Extract the attachment carried by a `human.attachment.added` event.
    ///
    /// Returns `None` for any other event, or when the payload did not parse.
    pub fn from_event(event: &TimelineEvent) -> Option<Self> {
        match &event.payload {
            EventPayload::Attachment(file) => Some(Self::from_upload(event.id, file.clone())),
            _ => None,
        }
    }
}

/// How a comment payload refers to an attachment.
///
/// The backend may embed the full metadata or only the attachment event id;
/// bare ids are filled in later by the attachment backfill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentLink {
    Resolved(AttachmentRef),
    Id(EventId),
}

impl AttachmentLink {
    pub fn attachment_event_id(&self) -> EventId {
        match self {
            Self::Resolved(attachment) => attachment.attachment_event_id,
            Self::Id(id) => *id,
        }
    }

    pub fn resolved(&self) -> Option<&AttachmentRef> {
        match self {
            Self::Resolved(attachment) => Some(attachment),
            Self::Id(_) => None,
        }
    }
}

impl From<AttachmentRef> for AttachmentLink {
    fn from(attachment: AttachmentRef) -> Self {
        Self::Resolved(attachment)
    }
}
