#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use hedgeline_core::{
    AttachmentLink, AttachmentRef, CommentPayload, EventId, EventPayload, EventType,
    LifecycleEvent, SubjectRef, TimelineEvent, UploadedFile, Visibility,
};
use hedgeline_timeline::{
    BackendError, DownloadedFile, EventPage, EventQuery, FileUpload, NewAttachment, NewComment,
    NewCorrection, TimelineBackend,
};

// -- Operation names ------------------------------------------------------

pub const LIST: &str = "list_events";
pub const COMMENT: &str = "create_comment";
pub const CORRECTION: &str = "create_correction";
pub const UPLOAD: &str = "upload_file";
pub const ATTACH: &str = "create_attachment_event";
pub const METADATA: &str = "attachment_metadata";
pub const DOWNLOAD: &str = "download_attachment";

// -- Scripted backend -----------------------------------------------------

/// In-process backend that records every call and can be told to fail.
#[derive(Default)]
pub struct FakeBackend {
    events: Mutex<Vec<TimelineEvent>>,
    blobs: Mutex<HashMap<String, Bytes>>,
    next_id: AtomicU64,
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashMap<&'static str, BackendError>>,
    scripted_pages: Mutex<VecDeque<EventPage>>,
    cancel_on_metadata: Mutex<Option<CancellationToken>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `op` fail with `err`.
    pub fn fail(&self, op: &'static str, err: BackendError) {
        self.failing.lock().unwrap().insert(op, err);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Return `page` from the next `list_events` call instead of the log.
    pub fn script_page(&self, page: EventPage) {
        self.scripted_pages.lock().unwrap().push_back(page);
    }

    /// Cancel `token` while the next metadata lookup is in flight.
    pub fn cancel_during_metadata(&self, token: CancellationToken) {
        *self.cancel_on_metadata.lock().unwrap() = Some(token);
    }

    pub fn seed_comment(&self, subject: &SubjectRef, body: &str) -> TimelineEvent {
        self.append(
            subject,
            EventType::CommentCreated,
            EventPayload::Comment(CommentPayload {
                body: body.to_owned(),
                ..CommentPayload::default()
            }),
            Visibility::All,
            None,
        )
    }

    pub fn seed_correction(&self, target: &TimelineEvent, body: &str) -> TimelineEvent {
        self.append(
            &target.subject(),
            EventType::CommentCorrected,
            EventPayload::Comment(CommentPayload {
                body: body.to_owned(),
                ..CommentPayload::default()
            }),
            target.visibility,
            Some(target.id),
        )
    }

    pub fn seed_lifecycle(&self, subject: &SubjectRef, event: LifecycleEvent) -> TimelineEvent {
        self.append(
            subject,
            EventType::Lifecycle(event),
            EventPayload::Lifecycle(serde_json::json!({})),
            Visibility::All,
            None,
        )
    }

    pub fn seed_attachment(&self, subject: &SubjectRef, file_name: &str) -> TimelineEvent {
        let file = self.store_blob(file_name, "application/octet-stream", Bytes::new());
        self.append(
            subject,
            EventType::AttachmentAdded,
            EventPayload::Attachment(file),
            Visibility::All,
            None,
        )
    }

    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(op);
        match self.failing.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn append(
        &self,
        subject: &SubjectRef,
        event_type: EventType,
        payload: EventPayload,
        visibility: Visibility,
        supersedes_event_id: Option<EventId>,
    ) -> TimelineEvent {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let event = TimelineEvent {
            id: EventId::new(id),
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            event_type,
            occurred_at: base + Duration::minutes(i64::try_from(id).unwrap()),
            visibility,
            payload,
            supersedes_event_id,
            actor: Some("tester".to_owned()),
        };
        self.events.lock().unwrap().push(event.clone());
        event
    }

    fn store_blob(&self, file_name: &str, mime: &str, bytes: Bytes) -> UploadedFile {
        let mut blobs = self.blobs.lock().unwrap();
        let file_id = format!("file-{}", blobs.len() + 1);
        let size = bytes.len() as u64;
        blobs.insert(file_id.clone(), bytes);
        UploadedFile {
            storage_uri: format!("fake://{file_id}"),
            file_id,
            file_name: file_name.to_owned(),
            mime: mime.to_owned(),
            size,
            checksum: None,
        }
    }

    fn find(&self, id: EventId) -> Option<TimelineEvent> {
        self.events.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }
}

#[async_trait]
impl TimelineBackend for FakeBackend {
    async fn list_events(&self, query: &EventQuery) -> Result<EventPage, BackendError> {
        self.record(LIST)?;
        if let Some(page) = self.scripted_pages.lock().unwrap().pop_front() {
            return Ok(page);
        }
        let subject = query.subject();
        let matching: Vec<TimelineEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.belongs_to(&subject))
            .filter(|e| query.after_id.is_none_or(|after| e.id > after))
            .cloned()
            .collect();
        let limit = query.limit as usize;
        Ok(EventPage {
            has_more: matching.len() > limit,
            events: matching.into_iter().take(limit).collect(),
        })
    }

    async fn create_comment(&self, request: &NewComment) -> Result<TimelineEvent, BackendError> {
        self.record(COMMENT)?;
        let subject = SubjectRef::new(request.subject_type.clone(), request.subject_id.clone());
        Ok(self.append(
            &subject,
            EventType::CommentCreated,
            EventPayload::Comment(CommentPayload {
                body: request.body.clone(),
                mentions: request.mentions.clone(),
                attachments: request.attachments.iter().copied().map(AttachmentLink::Id).collect(),
            }),
            request.visibility,
            None,
        ))
    }

    async fn create_correction(
        &self,
        request: &NewCorrection,
    ) -> Result<TimelineEvent, BackendError> {
        self.record(CORRECTION)?;
        let target = self
            .find(request.supersedes_event_id)
            .ok_or_else(|| BackendError::from_status(404, "event not found"))?;
        Ok(self.append(
            &target.subject(),
            EventType::CommentCorrected,
            EventPayload::Comment(CommentPayload {
                body: request.body.clone(),
                mentions: request.mentions.clone(),
                attachments: request.attachments.iter().copied().map(AttachmentLink::Id).collect(),
            }),
            target.visibility,
            Some(target.id),
        ))
    }

    async fn upload_file(
        &self,
        _subject: &SubjectRef,
        file: &FileUpload,
    ) -> Result<UploadedFile, BackendError> {
        self.record(UPLOAD)?;
        Ok(self.store_blob(&file.file_name, &file.mime, file.bytes.clone()))
    }

    async fn create_attachment_event(
        &self,
        request: &NewAttachment,
    ) -> Result<TimelineEvent, BackendError> {
        self.record(ATTACH)?;
        let subject = SubjectRef::new(request.subject_type.clone(), request.subject_id.clone());
        Ok(self.append(
            &subject,
            EventType::AttachmentAdded,
            EventPayload::Attachment(request.file.clone()),
            request.visibility,
            None,
        ))
    }

    async fn attachment_metadata(
        &self,
        attachment_event_id: EventId,
    ) -> Result<Option<AttachmentRef>, BackendError> {
        self.record(METADATA)?;
        if let Some(token) = self.cancel_on_metadata.lock().unwrap().take() {
            token.cancel();
        }
        Ok(self
            .find(attachment_event_id)
            .and_then(|e| AttachmentRef::from_event(&e)))
    }

    async fn download_attachment(
        &self,
        attachment_event_id: EventId,
    ) -> Result<DownloadedFile, BackendError> {
        self.record(DOWNLOAD)?;
        let attachment = self
            .find(attachment_event_id)
            .and_then(|e| AttachmentRef::from_event(&e))
            .ok_or_else(|| BackendError::from_status(404, "attachment not found"))?;
        let bytes = self
            .blobs
            .lock()
            .unwrap()
            .get(&attachment.file_id)
            .cloned()
            .unwrap_or_default();
        Ok(DownloadedFile {
            file_name: attachment.file_name,
            mime: Some(attachment.mime),
            bytes,
        })
    }
}

// -- Helpers --------------------------------------------------------------

pub fn subject() -> SubjectRef {
    SubjectRef::new("rfq", "RFQ-2024-017")
}

pub fn other_subject() -> SubjectRef {
    SubjectRef::new("deal", "D-88")
}

pub fn server_error() -> BackendError {
    BackendError::from_status(503, "upstream unavailable")
}

pub fn ids(events: &[TimelineEvent]) -> Vec<u64> {
    events.iter().map(|e| e.id.get()).collect()
}

pub fn upload(name: &str) -> FileUpload {
    FileUpload::new(name, "application/pdf", Bytes::from_static(b"%PDF-1.7 test"))
}
