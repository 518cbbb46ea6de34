use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use hedgeline_core::{AttachmentLink, AttachmentRef, EventId, TimelineEvent};

use crate::backend::TimelineBackend;

/// Attachment metadata known to a view, keyed by attachment event id.
#[derive(Debug, Clone, Default)]
pub struct AttachmentCatalog {
    entries: HashMap<EventId, AttachmentRef>,
}

impl AttachmentCatalog {
    /// Collect the metadata already present in `events`: attachment events
    /// themselves and attachments embedded in comment payloads.
    pub fn from_events(events: &[TimelineEvent]) -> Self {
        let mut catalog = Self::default();
        for event in events {
            if let Some(attachment) = AttachmentRef::from_event(event) {
                catalog.insert(attachment);
            }
            if let Some(comment) = event.comment() {
                for link in &comment.attachments {
                    if let Some(attachment) = link.resolved() {
                        catalog.insert(attachment.clone());
                    }
                }
            }
        }
        catalog
    }

    pub fn insert(&mut self, attachment: AttachmentRef) {
        self.entries.insert(attachment.attachment_event_id, attachment);
    }

    pub fn get(&self, attachment_event_id: EventId) -> Option<&AttachmentRef> {
        self.entries.get(&attachment_event_id)
    }

    pub fn contains(&self, attachment_event_id: EventId) -> bool {
        self.entries.contains_key(&attachment_event_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attachment ids referenced by comments in `events` that have no
    /// metadata yet, in order of first reference.
    pub fn missing_ids(&self, events: &[TimelineEvent]) -> Vec<EventId> {
        let mut seen = HashSet::new();
        events
            .iter()
            .filter_map(TimelineEvent::comment)
            .flat_map(|c| c.attachments.iter().map(AttachmentLink::attachment_event_id))
            .filter(|id| !self.contains(*id) && seen.insert(*id))
            .collect()
    }
}

/// Outcome of one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub resolved: Vec<EventId>,
    /// The backend has no attachment under these ids.
    pub not_found: Vec<EventId>,
    pub failed: Vec<EventId>,
    pub cancelled: bool,
}

/// Fetch metadata for every id in `ids` the catalog does not know yet.
///
/// Ids are fetched one at a time. The token is checked while each request is
/// in flight and again before its result is applied, so once `cancel` fires
/// the catalog is never touched again. A failed lookup is logged and skipped.
#[instrument(name = "timeline.backfill", skip_all, fields(requested = ids.len()))]
pub async fn backfill_attachments<B: TimelineBackend + ?Sized>(
    backend: &B,
    catalog: &mut AttachmentCatalog,
    ids: &[EventId],
    cancel: &CancellationToken,
) -> BackfillReport {
    let mut report = BackfillReport::default();

    for &id in ids {
        if catalog.contains(id) {
            continue;
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                report.cancelled = true;
                break;
            }
            result = backend.attachment_metadata(id) => result,
        };
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        match result {
            Ok(Some(attachment)) => {
                debug!(attachment_event_id = %id, "attachment metadata resolved");
                catalog.insert(attachment);
                report.resolved.push(id);
            }
            Ok(None) => {
                debug!(attachment_event_id = %id, "attachment not found");
                report.not_found.push(id);
            }
            Err(e) => {
                warn!(attachment_event_id = %id, error = %e, "attachment metadata lookup failed");
                report.failed.push(id);
            }
        }
    }

    if report.cancelled {
        info!(resolved = report.resolved.len(), "attachment backfill cancelled");
    }
    report
}
