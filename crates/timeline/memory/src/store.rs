use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use hedgeline_core::{
    AttachmentLink, AttachmentRef, CommentPayload, EventId, EventPayload, EventType,
    LifecycleEvent, SubjectRef, TimelineEvent, UploadedFile, Visibility,
};
use hedgeline_timeline::{
    BackendError, DownloadedFile, EventPage, EventQuery, FileUpload, NewAttachment, NewComment,
    NewCorrection, TimelineBackend, effective_limit,
};

/// A stored upload and the subject it was uploaded for.
struct StoredFile {
    subject: SubjectRef,
    file: UploadedFile,
    bytes: Bytes,
}

/// In-memory timeline backend using `DashMap`. Suitable for development and
/// testing.
///
/// Events are kept in a map keyed by id, with a secondary index from subject
/// to its event ids in append order. Nothing is ever updated or removed.
pub struct MemoryTimelineBackend {
    /// Primary store: event id -> event.
    events: DashMap<EventId, TimelineEvent>,
    /// Secondary index: subject -> event ids, ascending.
    subject_index: DashMap<SubjectRef, Vec<EventId>>,
    /// Uploaded files by file id.
    files: DashMap<String, StoredFile>,
    next_id: AtomicU64,
    actor: Option<String>,
}

impl MemoryTimelineBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            subject_index: DashMap::new(),
            files: DashMap::new(),
            next_id: AtomicU64::new(1),
            actor: None,
        }
    }

    /// Stamp human-authored events with `actor`.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Append a backend lifecycle event, as the business services would.
    pub fn record_lifecycle_event(
        &self,
        subject: &SubjectRef,
        event: LifecycleEvent,
        payload: serde_json::Value,
    ) -> TimelineEvent {
        self.record_event(subject, EventType::Lifecycle(event), payload, Visibility::All)
    }

    /// Append an arbitrary event without validation. The payload is
    /// interpreted according to `event_type`.
    pub fn record_event(
        &self,
        subject: &SubjectRef,
        event_type: EventType,
        payload: serde_json::Value,
        visibility: Visibility,
    ) -> TimelineEvent {
        let payload = EventPayload::parse(&event_type, payload);
        self.append(subject, event_type, payload, visibility, None, None)
    }

    /// Number of events across all subjects.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn append(
        &self,
        subject: &SubjectRef,
        event_type: EventType,
        payload: EventPayload,
        visibility: Visibility,
        supersedes_event_id: Option<EventId>,
        actor: Option<String>,
    ) -> TimelineEvent {
        // Holding the index entry serializes appends per subject, so ids in
        // the index are always ascending.
        let mut ids = self.subject_index.entry(subject.clone()).or_default();
        let id = EventId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let event = TimelineEvent {
            id,
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            event_type,
            occurred_at: Utc::now(),
            visibility,
            payload,
            supersedes_event_id,
            actor,
        };
        self.events.insert(id, event.clone());
        ids.push(id);
        debug!(
            event_id = %id,
            subject = %subject,
            event_type = %event.event_type,
            "event appended"
        );
        event
    }

    /// Resolve attachment ids referenced by a comment. Each must be an
    /// attachment event of `subject`.
    fn resolve_attachments(
        &self,
        subject: &SubjectRef,
        ids: &[EventId],
    ) -> Result<Vec<AttachmentLink>, BackendError> {
        ids.iter()
            .map(|id| {
                self.events
                    .get(id)
                    .filter(|e| e.belongs_to(subject))
                    .and_then(|e| AttachmentRef::from_event(e.value()))
                    .map(AttachmentLink::Resolved)
                    .ok_or_else(|| invalid(format!("unknown attachment {id} for {subject}")))
            })
            .collect()
    }
}

impl Default for MemoryTimelineBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimelineBackend for MemoryTimelineBackend {
    async fn list_events(&self, query: &EventQuery) -> Result<EventPage, BackendError> {
        let limit = effective_limit(query.limit) as usize;
        let Some(ids) = self.subject_index.get(&query.subject()) else {
            return Ok(EventPage {
                events: Vec::new(),
                has_more: false,
            });
        };

        let start = match query.after_id {
            Some(after) => ids.partition_point(|id| *id <= after),
            None => 0,
        };
        let remaining = &ids[start..];
        let events = remaining
            .iter()
            .take(limit)
            .filter_map(|id| self.events.get(id).map(|e| e.value().clone()))
            .collect();

        Ok(EventPage {
            events,
            has_more: remaining.len() > limit,
        })
    }

    async fn create_comment(&self, request: &NewComment) -> Result<TimelineEvent, BackendError> {
        if request.body.trim().is_empty() {
            return Err(invalid("body must not be empty"));
        }
        let subject = SubjectRef::new(request.subject_type.clone(), request.subject_id.clone());
        let attachments = self.resolve_attachments(&subject, &request.attachments)?;
        let payload = EventPayload::Comment(CommentPayload {
            body: request.body.clone(),
            mentions: request.mentions.clone(),
            attachments,
        });
        Ok(self.append(
            &subject,
            EventType::CommentCreated,
            payload,
            request.visibility,
            None,
            self.actor.clone(),
        ))
    }

    async fn create_correction(
        &self,
        request: &NewCorrection,
    ) -> Result<TimelineEvent, BackendError> {
        if request.body.trim().is_empty() {
            return Err(invalid("body must not be empty"));
        }
        let target = self
            .events
            .get(&request.supersedes_event_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| not_found(format!("event {} not found", request.supersedes_event_id)))?;
        if !target.event_type.is_comment() {
            return Err(invalid(format!("event {} cannot be corrected", target.id)));
        }

        // The correction lives on the target's subject and keeps its
        // visibility.
        let subject = target.subject();
        let attachments = self.resolve_attachments(&subject, &request.attachments)?;
        let payload = EventPayload::Comment(CommentPayload {
            body: request.body.clone(),
            mentions: request.mentions.clone(),
            attachments,
        });
        Ok(self.append(
            &subject,
            EventType::CommentCorrected,
            payload,
            target.visibility,
            Some(target.id),
            self.actor.clone(),
        ))
    }

    async fn upload_file(
        &self,
        subject: &SubjectRef,
        file: &FileUpload,
    ) -> Result<UploadedFile, BackendError> {
        if file.file_name.trim().is_empty() {
            return Err(invalid("file name must not be empty"));
        }
        let file_id = uuid::Uuid::new_v4().to_string();
        let uploaded = UploadedFile {
            storage_uri: format!("memory://{subject}/{file_id}"),
            file_id: file_id.clone(),
            file_name: file.file_name.clone(),
            mime: file.mime.clone(),
            size: file.size(),
            checksum: Some(format!("sha256:{}", hex::encode(Sha256::digest(&file.bytes)))),
        };
        self.files.insert(
            file_id,
            StoredFile {
                subject: subject.clone(),
                file: uploaded.clone(),
                bytes: file.bytes.clone(),
            },
        );
        debug!(file_id = %uploaded.file_id, size = uploaded.size, "file stored");
        Ok(uploaded)
    }

    async fn create_attachment_event(
        &self,
        request: &NewAttachment,
    ) -> Result<TimelineEvent, BackendError> {
        let subject = SubjectRef::new(request.subject_type.clone(), request.subject_id.clone());
        let file = {
            let stored = self
                .files
                .get(&request.file.file_id)
                .ok_or_else(|| invalid(format!("unknown file {}", request.file.file_id)))?;
            if stored.subject != subject {
                return Err(invalid(format!(
                    "file {} was uploaded for another subject",
                    request.file.file_id
                )));
            }
            stored.file.clone()
        };
        Ok(self.append(
            &subject,
            EventType::AttachmentAdded,
            EventPayload::Attachment(file),
            request.visibility,
            None,
            self.actor.clone(),
        ))
    }

    async fn attachment_metadata(
        &self,
        attachment_event_id: EventId,
    ) -> Result<Option<AttachmentRef>, BackendError> {
        Ok(self
            .events
            .get(&attachment_event_id)
            .and_then(|e| AttachmentRef::from_event(e.value())))
    }

    async fn download_attachment(
        &self,
        attachment_event_id: EventId,
    ) -> Result<DownloadedFile, BackendError> {
        let attachment = self
            .attachment_metadata(attachment_event_id)
            .await?
            .ok_or_else(|| not_found(format!("attachment {attachment_event_id} not found")))?;
        let stored = self
            .files
            .get(&attachment.file_id)
            .ok_or_else(|| not_found(format!("file {} not found", attachment.file_id)))?;
        Ok(DownloadedFile {
            file_name: attachment.file_name,
            mime: Some(attachment.mime),
            bytes: stored.bytes.clone(),
        })
    }
}

fn invalid(detail: impl Into<String>) -> BackendError {
    BackendError::from_status(422, detail)
}

fn not_found(detail: impl Into<String>) -> BackendError {
    BackendError::from_status(404, detail)
}
