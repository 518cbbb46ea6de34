//! Presentation of a loaded window.
//!
//! Rendering never fails: unrecognized event types and payloads that did not
//! match their type are flagged on the entry and still shown.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use hedgeline_core::{
    AttachmentLink, CorrectionIndex, EventId, EventOrigin, EventPayload, EventType, TimelineEvent,
    Visibility,
};

use crate::backfill::AttachmentCatalog;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Why an entry is shown with a warning marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFlag {
    UnrecognizedType,
    MalformedPayload,
}

/// One event, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEntry {
    pub id: EventId,
    pub event_type: String,
    pub label: String,
    pub origin: EventOrigin,
    pub visibility: Visibility,
    pub occurred_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub summary: String,
    /// Set when a later loaded event corrects this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrects: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<EntryFlag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl RenderedEntry {
    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }
}

impl fmt::Display for RenderedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.id, self.occurred_at, self.label)?;
        if let Some(actor) = &self.actor {
            write!(f, " by {actor}")?;
        }
        if self.visibility == Visibility::Finance {
            f.write_str(" [finance]")?;
        }
        if let Some(target) = self.corrects {
            write!(f, " (corrects #{target})")?;
        }
        if let Some(corrector) = self.superseded_by {
            write!(f, " (superseded by #{corrector})")?;
        }
        if !self.summary.is_empty() {
            write!(f, ": {}", self.summary)?;
        }
        for name in &self.attachments {
            write!(f, " [file: {name}]")?;
        }
        Ok(())
    }
}

/// Entries split by origin, each group oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelineView {
    pub automatic: Vec<RenderedEntry>,
    pub manual: Vec<RenderedEntry>,
}

impl TimelineView {
    pub fn len(&self) -> usize {
        self.automatic.len() + self.manual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.automatic.is_empty() && self.manual.is_empty()
    }

    /// All entries that carry a warning flag.
    pub fn flagged(&self) -> impl Iterator<Item = &RenderedEntry> {
        self.automatic
            .iter()
            .chain(&self.manual)
            .filter(|e| e.flag.is_some())
    }
}

/// Render a window's events against its correction index.
pub fn render(
    events: &[TimelineEvent],
    corrections: &CorrectionIndex,
    catalog: &AttachmentCatalog,
) -> TimelineView {
    let mut view = TimelineView::default();
    for event in events {
        let entry = render_entry(event, corrections, catalog);
        match entry.origin {
            EventOrigin::Automatic => view.automatic.push(entry),
            EventOrigin::Manual => view.manual.push(entry),
        }
    }
    view
}

pub fn render_entry(
    event: &TimelineEvent,
    corrections: &CorrectionIndex,
    catalog: &AttachmentCatalog,
) -> RenderedEntry {
    let (summary, flag) = summarize(event);
    RenderedEntry {
        id: event.id,
        event_type: event.event_type.as_str().to_owned(),
        label: label(&event.event_type).to_owned(),
        origin: event.origin(),
        visibility: event.visibility,
        occurred_at: format_timestamp(event.occurred_at),
        actor: event.actor.clone(),
        summary,
        superseded_by: corrections.superseded_by(event.id),
        corrects: event.supersedes_event_id,
        flag,
        attachments: attachment_names(event, catalog),
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn label(event_type: &EventType) -> &str {
    match event_type {
        EventType::CommentCreated => "Comment",
        EventType::CommentCorrected => "Correction",
        EventType::AttachmentAdded => "Attachment",
        EventType::Mentioned => "Mention",
        EventType::Lifecycle(event) => event.label(),
        EventType::Unrecognized(tag) => tag,
    }
}

fn summarize(event: &TimelineEvent) -> (String, Option<EntryFlag>) {
    match &event.payload {
        EventPayload::Comment(comment) => (comment.body.clone(), None),
        EventPayload::Attachment(file) => (
            format!("{} ({})", file.file_name, format_size(file.size)),
            None,
        ),
        EventPayload::Mention(mention) => (format!("mentioned @{}", mention.mentioned), None),
        EventPayload::Lifecycle(raw) => (compact(raw), None),
        EventPayload::Unrecognized(raw) => {
            let mut summary = format!("[unrecognized type: {}]", event.event_type);
            let detail = compact(raw);
            if !detail.is_empty() {
                summary.push(' ');
                summary.push_str(&detail);
            }
            (summary, Some(EntryFlag::UnrecognizedType))
        }
        EventPayload::Malformed { reason, .. } => (
            format!("[malformed payload: {reason}]"),
            Some(EntryFlag::MalformedPayload),
        ),
    }
}

fn attachment_names(event: &TimelineEvent, catalog: &AttachmentCatalog) -> Vec<String> {
    let Some(comment) = event.comment() else {
        return Vec::new();
    };
    comment
        .attachments
        .iter()
        .map(|link| match link {
            AttachmentLink::Resolved(attachment) => attachment.file_name.clone(),
            AttachmentLink::Id(id) => catalog
                .get(*id)
                .map_or_else(|| format!("attachment #{id}"), |a| a.file_name.clone()),
        })
        .collect()
}

/// Lifecycle and unknown payloads are shown as compact JSON; empty objects
/// and nulls are omitted.
fn compact(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Object(map) if map.is_empty() => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
