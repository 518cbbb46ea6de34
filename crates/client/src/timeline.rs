use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use hedgeline_core::{AttachmentRef, EventId, SubjectRef, TimelineEvent, UploadedFile};
use hedgeline_timeline::{
    BackendError, DownloadedFile, EventPage, EventQuery, FileUpload, NewAttachment, NewComment,
    NewCorrection, TimelineBackend,
};

use crate::disposition;
use crate::{Error, TimelineClient, decode, error_from_response};

impl TimelineClient {
    // =========================================================================
    // Timeline
    // =========================================================================

    /// Fetch one page of a subject's timeline, oldest first.
    pub async fn list_events(&self, query: &EventQuery) -> Result<EventPage, Error> {
        let req = self
            .client
            .get(self.url("/api/timeline/events"))
            .query(query);
        decode(self.send(req).await?).await
    }

    /// Append a comment.
    pub async fn create_comment(&self, request: &NewComment) -> Result<TimelineEvent, Error> {
        let req = self
            .client
            .post(self.url("/api/timeline/comments"))
            .json(request);
        decode(self.send(req).await?).await
    }

    /// Append a correction of an earlier comment.
    pub async fn create_correction(
        &self,
        request: &NewCorrection,
    ) -> Result<TimelineEvent, Error> {
        let req = self
            .client
            .post(self.url("/api/timeline/corrections"))
            .json(request);
        decode(self.send(req).await?).await
    }

    /// Upload a file. No timeline event is created until
    /// [`create_attachment_event`](Self::create_attachment_event) is called.
    pub async fn upload_file(
        &self,
        subject: &SubjectRef,
        file: &FileUpload,
    ) -> Result<UploadedFile, Error> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)
            .map_err(|e| Error::Configuration(format!("invalid mime type {}: {e}", file.mime)))?;
        let form = Form::new()
            .text("subject_type", subject.subject_type.to_string())
            .text("subject_id", subject.subject_id.to_string())
            .part("file", part);

        let req = self
            .client
            .post(self.url("/api/timeline/uploads"))
            .multipart(form);
        decode(self.send(req).await?).await
    }

    /// Record the attachment event for an uploaded file.
    pub async fn create_attachment_event(
        &self,
        request: &NewAttachment,
    ) -> Result<TimelineEvent, Error> {
        let req = self
            .client
            .post(self.url("/api/timeline/attachments"))
            .json(request);
        decode(self.send(req).await?).await
    }

    /// Attachment metadata by attachment event id. Returns `None` on 404.
    pub async fn attachment_metadata(
        &self,
        attachment_event_id: EventId,
    ) -> Result<Option<AttachmentRef>, Error> {
        let req = self.client.get(self.url(&format!(
            "/api/timeline/attachments/{attachment_event_id}"
        )));
        let response = self.send(req).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    /// Download an attachment's content.
    ///
    /// The file name comes from `Content-Disposition`, falling back to
    /// `attachment-{id}`.
    pub async fn download_attachment(
        &self,
        attachment_event_id: EventId,
    ) -> Result<DownloadedFile, Error> {
        let req = self.client.get(self.url(&format!(
            "/api/timeline/attachments/{attachment_event_id}/download"
        )));
        let response = self.send(req).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition::filename)
            .unwrap_or_else(|| disposition::fallback_filename(attachment_event_id));
        let mime = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(DownloadedFile {
            file_name,
            mime,
            bytes,
        })
    }
}

#[async_trait]
impl TimelineBackend for TimelineClient {
    async fn list_events(&self, query: &EventQuery) -> Result<EventPage, BackendError> {
        Ok(TimelineClient::list_events(self, query).await?)
    }

    async fn create_comment(&self, request: &NewComment) -> Result<TimelineEvent, BackendError> {
        Ok(TimelineClient::create_comment(self, request).await?)
    }

    async fn create_correction(
        &self,
        request: &NewCorrection,
    ) -> Result<TimelineEvent, BackendError> {
        Ok(TimelineClient::create_correction(self, request).await?)
    }

    async fn upload_file(
        &self,
        subject: &SubjectRef,
        file: &FileUpload,
    ) -> Result<UploadedFile, BackendError> {
        Ok(TimelineClient::upload_file(self, subject, file).await?)
    }

    async fn create_attachment_event(
        &self,
        request: &NewAttachment,
    ) -> Result<TimelineEvent, BackendError> {
        Ok(TimelineClient::create_attachment_event(self, request).await?)
    }

    async fn attachment_metadata(
        &self,
        attachment_event_id: EventId,
    ) -> Result<Option<AttachmentRef>, BackendError> {
        Ok(TimelineClient::attachment_metadata(self, attachment_event_id).await?)
    }

    async fn download_attachment(
        &self,
        attachment_event_id: EventId,
    ) -> Result<DownloadedFile, BackendError> {
        Ok(TimelineClient::download_attachment(self, attachment_event_id).await?)
    }
}
