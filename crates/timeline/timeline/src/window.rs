use std::sync::Arc;

use tracing::{debug, instrument, warn};

use hedgeline_core::{CorrectionIndex, EventId, Locale, Role, SubjectRef, TimelineEvent};

use crate::backend::TimelineBackend;
use crate::composer::Composer;
use crate::editor::CorrectionEditor;
use crate::error::{ComposeError, WindowError};
use crate::request::{EventQuery, effective_limit};

/// The loaded, in-memory portion of one subject's timeline.
///
/// Pages are loaded oldest first. Ids stay strictly increasing across pages
/// so the correction index's last-write-wins rule holds for the whole
/// window. Failures never discard already-loaded events; they leave an
/// error state that a later [`refetch`](Self::refetch) or
/// [`load_more`](Self::load_more) clears.
pub struct EventWindow<B: TimelineBackend + ?Sized> {
    backend: Arc<B>,
    subject: SubjectRef,
    limit: u32,
    events: Vec<TimelineEvent>,
    has_more: bool,
    loaded: bool,
    error: Option<WindowError>,
    corrections: CorrectionIndex,
}

impl<B: TimelineBackend + ?Sized> EventWindow<B> {
    /// Create an empty window. Nothing is fetched until
    /// [`refetch`](Self::refetch) is called.
    pub fn new(backend: Arc<B>, subject: SubjectRef, limit: u32) -> Self {
        Self {
            backend,
            subject,
            limit: effective_limit(limit),
            events: Vec::new(),
            has_more: false,
            loaded: false,
            error: None,
            corrections: CorrectionIndex::default(),
        }
    }

    /// Create a window and load its first page.
    ///
    /// A failed first load still returns the window, in its error state.
    pub async fn fetch(backend: Arc<B>, subject: SubjectRef, limit: u32) -> Self {
        let mut window = Self::new(backend, subject, limit);
        // The error is kept in the window's state.
        let _ = window.refetch().await;
        window
    }

    /// Restart from the first page, replacing the loaded events on success.
    #[instrument(name = "timeline.refetch", skip(self), fields(subject = %self.subject))]
    pub async fn refetch(&mut self) -> Result<(), WindowError> {
        let query = EventQuery::first_page(&self.subject, self.limit);
        match self.backend.list_events(&query).await {
            Ok(page) => {
                let mut events = page.events;
                let dropped = normalize_page(&mut events, None);
                if dropped > 0 {
                    warn!(dropped, "first page carried duplicate event ids");
                }
                debug!(count = events.len(), has_more = page.has_more, "loaded first page");
                self.events = events;
                self.has_more = page.has_more;
                self.loaded = true;
                self.error = None;
                self.reindex();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "timeline fetch failed");
                let err = WindowError::from(e);
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Append the next page after the last loaded event.
    ///
    /// Returns the number of events appended. Does nothing when the server
    /// signalled there is nothing more.
    #[instrument(name = "timeline.load_more", skip(self), fields(subject = %self.subject))]
    pub async fn load_more(&mut self) -> Result<usize, WindowError> {
        if !self.loaded {
            self.refetch().await?;
            return Ok(self.events.len());
        }
        if !self.has_more {
            return Ok(0);
        }

        let cursor = self.last_id();
        let query = EventQuery::first_page(&self.subject, self.limit).after(cursor);
        match self.backend.list_events(&query).await {
            Ok(page) => {
                let mut events = page.events;
                let dropped = normalize_page(&mut events, cursor);
                if dropped > 0 {
                    warn!(dropped, "page overlapped the loaded window; duplicates dropped");
                }
                let appended = events.len();
                self.events.extend(events);
                self.has_more = page.has_more;
                self.error = None;
                self.reindex();
                debug!(appended, has_more = self.has_more, "loaded next page");
                Ok(appended)
            }
            Err(e) => {
                warn!(error = %e, "timeline page fetch failed");
                let err = WindowError::from(e);
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Stage a new comment on this window's subject.
    pub fn composer(&self, role: Role, locale: Locale) -> Composer<B> {
        Composer::new(Arc::clone(&self.backend), self.subject.clone(), role, locale)
    }

    /// Stage a correction of a loaded comment.
    pub fn correction_editor(
        &self,
        target_id: EventId,
        role: Role,
        locale: Locale,
    ) -> Result<CorrectionEditor<B>, ComposeError> {
        CorrectionEditor::open(self, target_id, role, locale)
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn subject(&self) -> &SubjectRef {
        &self.subject
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn get(&self, id: EventId) -> Option<&TimelineEvent> {
        self.events
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.events[idx])
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&WindowError> {
        self.error.as_ref()
    }

    pub fn corrections(&self) -> &CorrectionIndex {
        &self.corrections
    }

    pub fn last_id(&self) -> Option<EventId> {
        self.events.last().map(|e| e.id)
    }

    fn reindex(&mut self) {
        self.corrections = CorrectionIndex::build(&self.events);
    }
}

/// Sort a page by id, then drop ids at or below the cursor and repeated ids.
/// Returns how many were dropped.
fn normalize_page(events: &mut Vec<TimelineEvent>, cursor: Option<EventId>) -> usize {
    let before = events.len();
    events.sort_by_key(|e| e.id);
    if let Some(cursor) = cursor {
        events.retain(|e| e.id > cursor);
    }
    events.dedup_by_key(|e| e.id);
    before - events.len()
}
