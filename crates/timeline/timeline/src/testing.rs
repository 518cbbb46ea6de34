use hedgeline_core::{EventId, EventType, SubjectRef, TimelineEvent, Visibility, extract_mentions};

use crate::backend::TimelineBackend;
use crate::error::BackendError;
use crate::request::{EventQuery, FileUpload, NewAttachment, NewComment, NewCorrection};

fn test_subject(id: &str) -> SubjectRef {
    SubjectRef::new("conformance", id)
}

fn new_comment(subject: &SubjectRef, body: &str, visibility: Visibility) -> NewComment {
    NewComment {
        subject_type: subject.subject_type.clone(),
        subject_id: subject.subject_id.clone(),
        body: body.to_owned(),
        visibility,
        mentions: extract_mentions(body),
        attachments: Vec::new(),
    }
}

fn ids(events: &[TimelineEvent]) -> Vec<EventId> {
    events.iter().map(|e| e.id).collect()
}

/// Run the full timeline backend conformance test suite.
///
/// Call this from your backend's test module with a fresh backend instance.
/// Every check uses its own subject, so the suite can share one instance.
///
/// # Errors
///
/// Returns an error if a backend call that must succeed fails.
pub async fn run_backend_conformance_tests(
    backend: &dyn TimelineBackend,
) -> Result<(), BackendError> {
    test_empty_subject(backend).await?;
    test_create_and_list_comment(backend).await?;
    test_ids_increase(backend).await?;
    test_paging(backend).await?;
    test_subjects_are_isolated(backend).await?;
    test_correction_appends(backend).await?;
    test_correction_inherits_visibility(backend).await?;
    test_correction_of_missing_target(backend).await?;
    test_correction_of_non_comment(backend).await?;
    test_attachment_round_trip(backend).await?;
    test_missing_attachment(backend).await?;
    Ok(())
}

async fn test_empty_subject(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("empty");
    let page = backend.list_events(&EventQuery::first_page(&subject, 10)).await?;
    assert!(page.events.is_empty(), "unknown subject should have no events");
    assert!(!page.has_more, "empty page should not signal more");
    Ok(())
}

async fn test_create_and_list_comment(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("create");
    let created = backend
        .create_comment(&new_comment(&subject, "spread looks off @risk.desk", Visibility::All))
        .await?;

    assert_eq!(created.event_type, EventType::CommentCreated);
    assert!(created.belongs_to(&subject));
    assert!(created.supersedes_event_id.is_none());
    let comment = created.comment().expect("comment payload");
    assert_eq!(comment.body, "spread looks off @risk.desk");
    assert_eq!(comment.mentions, vec!["risk.desk".to_owned()]);

    let page = backend.list_events(&EventQuery::first_page(&subject, 10)).await?;
    assert_eq!(page.events, vec![created], "listed event should match created event");
    Ok(())
}

async fn test_ids_increase(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("ids");
    let first = backend
        .create_comment(&new_comment(&subject, "one", Visibility::All))
        .await?;
    let second = backend
        .create_comment(&new_comment(&subject, "two", Visibility::All))
        .await?;
    assert!(second.id > first.id, "ids must be assigned in increasing order");
    assert!(second.occurred_at >= first.occurred_at);
    Ok(())
}

async fn test_paging(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("paging");
    let mut created = Vec::new();
    for body in ["a", "b", "c"] {
        created.push(
            backend
                .create_comment(&new_comment(&subject, body, Visibility::All))
                .await?
                .id,
        );
    }

    let first = backend.list_events(&EventQuery::first_page(&subject, 2)).await?;
    assert_eq!(ids(&first.events), created[..2].to_vec());
    assert!(first.has_more, "first page of three with limit two has more");

    let query = EventQuery::first_page(&subject, 2).after(Some(created[1]));
    let second = backend.list_events(&query).await?;
    assert_eq!(ids(&second.events), created[2..].to_vec());
    assert!(!second.has_more, "last page should not signal more");
    Ok(())
}

async fn test_subjects_are_isolated(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let left = test_subject("isolated-left");
    let right = test_subject("isolated-right");
    backend
        .create_comment(&new_comment(&left, "left only", Visibility::All))
        .await?;
    let page = backend.list_events(&EventQuery::first_page(&right, 10)).await?;
    assert!(page.events.is_empty(), "events must not leak across subjects");
    Ok(())
}

async fn test_correction_appends(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("correction");
    let original = backend
        .create_comment(&new_comment(&subject, "qty 1000 t", Visibility::All))
        .await?;
    let correction = backend
        .create_correction(&NewCorrection {
            supersedes_event_id: original.id,
            body: "qty 100 t".into(),
            mentions: Vec::new(),
            attachments: Vec::new(),
        })
        .await?;

    assert_eq!(correction.event_type, EventType::CommentCorrected);
    assert_eq!(correction.supersedes_event_id, Some(original.id));
    assert!(correction.id > original.id);
    assert!(correction.same_subject(&original));

    let page = backend.list_events(&EventQuery::first_page(&subject, 10)).await?;
    assert_eq!(page.events.len(), 2, "correction is appended, not applied in place");
    assert_eq!(page.events[0], original, "original must be unchanged");
    Ok(())
}

async fn test_correction_inherits_visibility(
    backend: &dyn TimelineBackend,
) -> Result<(), BackendError> {
    let subject = test_subject("correction-visibility");
    let original = backend
        .create_comment(&new_comment(&subject, "margin call", Visibility::Finance))
        .await?;
    let correction = backend
        .create_correction(&NewCorrection {
            supersedes_event_id: original.id,
            body: "margin call cleared".into(),
            mentions: Vec::new(),
            attachments: Vec::new(),
        })
        .await?;
    assert_eq!(correction.visibility, Visibility::Finance);
    Ok(())
}

async fn test_correction_of_missing_target(
    backend: &dyn TimelineBackend,
) -> Result<(), BackendError> {
    let result = backend
        .create_correction(&NewCorrection {
            supersedes_event_id: EventId::new(u64::MAX),
            body: "nothing to fix".into(),
            mentions: Vec::new(),
            attachments: Vec::new(),
        })
        .await;
    let err = result.expect_err("correcting an unknown event must fail");
    assert!(err.status().is_some(), "rejection should carry a status code");
    Ok(())
}

async fn test_correction_of_non_comment(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("correction-non-comment");
    let uploaded = backend
        .upload_file(&subject, &FileUpload::new("a.txt", "text/plain", "a"))
        .await?;
    let attachment = backend
        .create_attachment_event(&NewAttachment {
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            file: uploaded,
            visibility: Visibility::All,
        })
        .await?;
    let result = backend
        .create_correction(&NewCorrection {
            supersedes_event_id: attachment.id,
            body: "not a comment".into(),
            mentions: Vec::new(),
            attachments: Vec::new(),
        })
        .await;
    assert!(result.is_err(), "only comments can be corrected");
    Ok(())
}

async fn test_attachment_round_trip(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let subject = test_subject("attachment");
    let file = FileUpload::new("confirm.pdf", "application/pdf", &b"%PDF-1.7"[..]);

    let uploaded = backend.upload_file(&subject, &file).await?;
    assert_eq!(uploaded.file_name, "confirm.pdf");
    assert_eq!(uploaded.size, file.size());

    let event = backend
        .create_attachment_event(&NewAttachment {
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            file: uploaded.clone(),
            visibility: Visibility::Finance,
        })
        .await?;
    assert_eq!(event.event_type, EventType::AttachmentAdded);
    assert_eq!(event.visibility, Visibility::Finance);

    let metadata = backend
        .attachment_metadata(event.id)
        .await?
        .expect("attachment metadata");
    assert_eq!(metadata.attachment_event_id, event.id);
    assert_eq!(metadata.file_id, uploaded.file_id);

    let downloaded = backend.download_attachment(event.id).await?;
    assert_eq!(downloaded.file_name, "confirm.pdf");
    assert_eq!(downloaded.bytes, file.bytes);
    Ok(())
}

async fn test_missing_attachment(backend: &dyn TimelineBackend) -> Result<(), BackendError> {
    let metadata = backend.attachment_metadata(EventId::new(u64::MAX)).await?;
    assert!(metadata.is_none(), "unknown attachment should return None");
    let download = backend.download_attachment(EventId::new(u64::MAX)).await;
    assert!(download.is_err(), "downloading an unknown attachment must fail");
    Ok(())
}
