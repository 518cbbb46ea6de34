pub mod attach;
pub mod comment;
pub mod correct;
pub mod download;
pub mod list;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use hedgeline_core::{Locale, SubjectRef};
use hedgeline_timeline::{ComposeError, EventWindow, FileUpload, TimelineBackend};

/// The business object whose timeline a command works on.
#[derive(Args, Debug, Clone)]
pub struct SubjectArgs {
    /// Subject type (e.g. `rfq`, `deal`, `sales_order`).
    pub subject_type: String,
    /// Subject id (e.g. `RFQ-2024-017`).
    pub subject_id: String,
}

impl SubjectArgs {
    pub fn subject(&self) -> SubjectRef {
        SubjectRef::new(self.subject_type.as_str(), self.subject_id.as_str())
    }
}

/// Load a subject's window, optionally following `has_more` to the end.
pub async fn load_window<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    subject: SubjectRef,
    limit: u32,
    all: bool,
    locale: Locale,
) -> anyhow::Result<EventWindow<B>> {
    let mut window = EventWindow::fetch(backend, subject, limit).await;
    if let Some(err) = window.error() {
        return Err(anyhow::Error::new(err.clone()).context(err.message(locale)));
    }
    while all && window.has_more() {
        match window.load_more().await {
            Ok(0) => {
                tracing::warn!(
                    loaded = window.events().len(),
                    "server reported more events but the page added none; stopping"
                );
                break;
            }
            Ok(_) => {}
            Err(err) => {
                let message = err.message(locale);
                return Err(anyhow::Error::new(err).context(message));
            }
        }
    }
    Ok(window)
}

/// Attach the localized user message to a compose failure.
pub fn compose_failure(err: ComposeError, locale: Locale) -> anyhow::Error {
    let message = err.message(locale);
    anyhow::Error::new(err).context(message)
}

/// Read a local file for upload.
pub async fn read_upload(path: &Path, mime: Option<&str>) -> anyhow::Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let mime = mime.map_or_else(|| guess_mime(path).to_owned(), str::to_owned);
    Ok(FileUpload::new(file_name, mime, bytes))
}

/// Mime type from a file extension, for the formats the desk exchanges.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "txt" | "log" => "text/plain",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "eml" => "message/rfc822",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hedgeline_core::{AttachmentRef, EventId, TimelineEvent, UploadedFile, Visibility};
    use hedgeline_timeline::{
        BackendError, DownloadedFile, EventPage, EventQuery, NewAttachment, NewComment,
        NewCorrection,
    };
    use hedgeline_timeline_memory::MemoryTimelineBackend;

    use super::*;

    /// Serves the first page for every query and always claims there is more.
    struct StuckPaging(MemoryTimelineBackend);

    #[async_trait]
    impl TimelineBackend for StuckPaging {
        async fn list_events(&self, query: &EventQuery) -> Result<EventPage, BackendError> {
            let first = query.clone().after(None);
            let page = self.0.list_events(&first).await?;
            Ok(EventPage {
                events: page.events,
                has_more: true,
            })
        }

        async fn create_comment(
            &self,
            request: &NewComment,
        ) -> Result<TimelineEvent, BackendError> {
            self.0.create_comment(request).await
        }

        async fn create_correction(
            &self,
            request: &NewCorrection,
        ) -> Result<TimelineEvent, BackendError> {
            self.0.create_correction(request).await
        }

        async fn upload_file(
            &self,
            subject: &SubjectRef,
            file: &FileUpload,
        ) -> Result<UploadedFile, BackendError> {
            self.0.upload_file(subject, file).await
        }

        async fn create_attachment_event(
            &self,
            request: &NewAttachment,
        ) -> Result<TimelineEvent, BackendError> {
            self.0.create_attachment_event(request).await
        }

        async fn attachment_metadata(
            &self,
            attachment_event_id: EventId,
        ) -> Result<Option<AttachmentRef>, BackendError> {
            self.0.attachment_metadata(attachment_event_id).await
        }

        async fn download_attachment(
            &self,
            attachment_event_id: EventId,
        ) -> Result<DownloadedFile, BackendError> {
            self.0.download_attachment(attachment_event_id).await
        }
    }

    #[tokio::test]
    async fn load_all_stops_when_a_page_adds_nothing() {
        let backend = Arc::new(StuckPaging(MemoryTimelineBackend::new()));
        for body in ["bid 101.5", "bid 101.25"] {
            backend
                .create_comment(&NewComment {
                    subject_type: "rfq".into(),
                    subject_id: "RFQ-9".into(),
                    body: body.to_owned(),
                    visibility: Visibility::All,
                    mentions: Vec::new(),
                    attachments: Vec::new(),
                })
                .await
                .unwrap();
        }

        let window = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            load_window(backend, SubjectRef::new("rfq", "RFQ-9"), 10, true, Locale::En),
        )
        .await
        .expect("paging loop terminates")
        .unwrap();

        assert_eq!(window.events().len(), 2);
        assert!(window.has_more());
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime(Path::new("confirm.PDF")), "application/pdf");
        assert_eq!(guess_mime(Path::new("fills.csv")), "text/csv");
        assert_eq!(guess_mime(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn read_upload_uses_file_name_and_override() {
        let path = std::env::temp_dir().join(format!("hedgeline-{}.csv", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"a,b\n").await.unwrap();

        let upload = read_upload(&path, None).await.unwrap();
        assert_eq!(upload.mime, "text/csv");
        assert_eq!(upload.size(), 4);
        assert!(upload.file_name.starts_with("hedgeline-"));

        let upload = read_upload(&path, Some("text/plain")).await.unwrap();
        assert_eq!(upload.mime, "text/plain");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn read_upload_reports_missing_file() {
        let err = read_upload(Path::new("/nonexistent/x.pdf"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
