use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::{AttachmentLink, UploadedFile};
use crate::error::CoreError;
use crate::types::{EventId, SubjectId, SubjectRef, SubjectType};

pub const COMMENT_CREATED: &str = "human.comment.created";
pub const COMMENT_CORRECTED: &str = "human.comment.corrected";
pub const ATTACHMENT_ADDED: &str = "human.attachment.added";
pub const MENTIONED: &str = "human.mentioned";

/// Lifecycle transitions the backend records automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    OrderCreated,
    OrderApproved,
    OrderRejected,
    OrderCancelled,
    ContractCreated,
    ContractSigned,
    ExposureOpened,
    ExposureHedged,
    ExposureClosed,
    WorkflowTransitioned,
    RfqCreated,
    RfqQuoteReceived,
    RfqQuoteAwarded,
    RfqQuoteRejected,
    RfqQuotesRefreshed,
}

impl LifecycleEvent {
    pub const ALL: [Self; 15] = [
        Self::OrderCreated,
        Self::OrderApproved,
        Self::OrderRejected,
        Self::OrderCancelled,
        Self::ContractCreated,
        Self::ContractSigned,
        Self::ExposureOpened,
        Self::ExposureHedged,
        Self::ExposureClosed,
        Self::WorkflowTransitioned,
        Self::RfqCreated,
        Self::RfqQuoteReceived,
        Self::RfqQuoteAwarded,
        Self::RfqQuoteRejected,
        Self::RfqQuotesRefreshed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order.created",
            Self::OrderApproved => "order.approved",
            Self::OrderRejected => "order.rejected",
            Self::OrderCancelled => "order.cancelled",
            Self::ContractCreated => "contract.created",
            Self::ContractSigned => "contract.signed",
            Self::ExposureOpened => "exposure.opened",
            Self::ExposureHedged => "exposure.hedged",
            Self::ExposureClosed => "exposure.closed",
            Self::WorkflowTransitioned => "workflow.transitioned",
            Self::RfqCreated => "rfq.created",
            Self::RfqQuoteReceived => "rfq.quote_received",
            Self::RfqQuoteAwarded => "rfq.quote_awarded",
            Self::RfqQuoteRejected => "rfq.quote_rejected",
            Self::RfqQuotesRefreshed => "rfq.quotes_refreshed",
        }
    }

    /// Short human label used by the renderer.
    pub fn label(self) -> &'static str {
        match self {
            Self::OrderCreated => "Order created",
            Self::OrderApproved => "Order approved",
            Self::OrderRejected => "Order rejected",
            Self::OrderCancelled => "Order cancelled",
            Self::ContractCreated => "Contract created",
            Self::ContractSigned => "Contract signed",
            Self::ExposureOpened => "Exposure opened",
            Self::ExposureHedged => "Exposure hedged",
            Self::ExposureClosed => "Exposure closed",
            Self::WorkflowTransitioned => "Workflow transition",
            Self::RfqCreated => "RFQ created",
            Self::RfqQuoteReceived => "Quote received",
            Self::RfqQuoteAwarded => "Quote awarded",
            Self::RfqQuoteRejected => "Quote rejected",
            Self::RfqQuotesRefreshed => "Quotes refreshed",
        }
    }

    fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == tag)
    }
}

/// The `event_type` tag of a timeline event.
///
/// Tags outside the known vocabulary are preserved verbatim in
/// [`EventType::Unrecognized`] so they can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    CommentCreated,
    CommentCorrected,
    AttachmentAdded,
    Mentioned,
    Lifecycle(LifecycleEvent),
    Unrecognized(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CommentCreated => COMMENT_CREATED,
            Self::CommentCorrected => COMMENT_CORRECTED,
            Self::AttachmentAdded => ATTACHMENT_ADDED,
            Self::Mentioned => MENTIONED,
            Self::Lifecycle(event) => event.as_str(),
            Self::Unrecognized(tag) => tag,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Both the original comment and its corrections carry a comment body.
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::CommentCreated | Self::CommentCorrected)
    }

    /// Where the event came from. Unrecognized `human.*` tags still count as
    /// manual so they sit next to the rest of the discussion.
    pub fn origin(&self) -> EventOrigin {
        match self {
            Self::Lifecycle(_) => EventOrigin::Automatic,
            Self::Unrecognized(tag) if !tag.starts_with("human.") => EventOrigin::Automatic,
            _ => EventOrigin::Manual,
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        match tag {
            COMMENT_CREATED => Self::CommentCreated,
            COMMENT_CORRECTED => Self::CommentCorrected,
            ATTACHMENT_ADDED => Self::AttachmentAdded,
            MENTIONED => Self::Mentioned,
            other => LifecycleEvent::parse(other)
                .map_or_else(|| Self::Unrecognized(other.to_owned()), Self::Lifecycle),
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Unrecognized(tag) => tag,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Automatic (backend lifecycle) vs manual (human-authored) events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    Automatic,
    Manual,
}

/// Audience of an event. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    All,
    /// Restricted to users holding the finance capability.
    Finance,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Finance => "finance",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "finance" | "finance-restricted" | "finance_restricted" => Ok(Self::Finance),
            other => Err(CoreError::UnknownVisibility(other.to_owned())),
        }
    }
}

/// Payload of `human.comment.created` and `human.comment.corrected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub body: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentLink>,
}

/// Payload of `human.mentioned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionPayload {
    /// Identity the backend resolved the raw `@token` to.
    pub mentioned: String,
    /// Comment that contained the mention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<EventId>,
}

/// Event payload, typed by `event_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Comment(CommentPayload),
    Attachment(UploadedFile),
    Mention(MentionPayload),
    /// Backend lifecycle payloads are opaque to this layer.
    Lifecycle(serde_json::Value),
    /// Raw payload of an unrecognized event type, kept for display.
    Unrecognized(serde_json::Value),
    /// A known event type whose payload did not have the expected shape.
    Malformed {
        raw: serde_json::Value,
        reason: String,
    },
}

impl EventPayload {
    /// Interpret a raw payload according to its event type.
    pub fn parse(event_type: &EventType, raw: serde_json::Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(
            raw: serde_json::Value,
            wrap: fn(T) -> EventPayload,
        ) -> EventPayload {
            match serde_json::from_value::<T>(raw.clone()) {
                Ok(value) => wrap(value),
                Err(e) => EventPayload::Malformed {
                    raw,
                    reason: e.to_string(),
                },
            }
        }

        match event_type {
            EventType::CommentCreated | EventType::CommentCorrected => {
                typed(raw, EventPayload::Comment)
            }
            EventType::AttachmentAdded => typed(raw, EventPayload::Attachment),
            EventType::Mentioned => typed(raw, EventPayload::Mention),
            EventType::Lifecycle(_) => Self::Lifecycle(raw),
            EventType::Unrecognized(_) => Self::Unrecognized(raw),
        }
    }

    /// The payload as JSON, as it travels on the wire.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Comment(comment) => serde_json::to_value(comment).unwrap_or_default(),
            Self::Attachment(file) => serde_json::to_value(file).unwrap_or_default(),
            Self::Mention(mention) => serde_json::to_value(mention).unwrap_or_default(),
            Self::Lifecycle(raw) | Self::Unrecognized(raw) | Self::Malformed { raw, .. } => {
                raw.clone()
            }
        }
    }

    pub fn as_comment(&self) -> Option<&CommentPayload> {
        match self {
            Self::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

/// One entry of a subject's append-only timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEvent", into = "WireEvent")]
pub struct TimelineEvent {
    pub id: EventId,
    pub subject_type: SubjectType,
    pub subject_id: SubjectId,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub visibility: Visibility,
    pub payload: EventPayload,
    /// The earlier event of the same subject this event corrects.
    pub supersedes_event_id: Option<EventId>,
    /// Display identity of the author; absent for lifecycle events.
    pub actor: Option<String>,
}

impl TimelineEvent {
    pub fn subject(&self) -> SubjectRef {
        SubjectRef {
            subject_type: self.subject_type.clone(),
            subject_id: self.subject_id.clone(),
        }
    }

    pub fn belongs_to(&self, subject: &SubjectRef) -> bool {
        self.subject_type == subject.subject_type && self.subject_id == subject.subject_id
    }

    pub fn same_subject(&self, other: &Self) -> bool {
        self.subject_type == other.subject_type && self.subject_id == other.subject_id
    }

    pub fn origin(&self) -> EventOrigin {
        self.event_type.origin()
    }

    pub fn comment(&self) -> Option<&CommentPayload> {
        self.payload.as_comment()
    }
}

/// Shape of an event as exchanged with the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEvent {
    id: EventId,
    subject_type: SubjectType,
    subject_id: SubjectId,
    event_type: EventType,
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supersedes_event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor: Option<String>,
}

impl From<WireEvent> for TimelineEvent {
    fn from(wire: WireEvent) -> Self {
        let payload = EventPayload::parse(&wire.event_type, wire.payload);
        Self {
            id: wire.id,
            subject_type: wire.subject_type,
            subject_id: wire.subject_id,
            event_type: wire.event_type,
            occurred_at: wire.occurred_at,
            visibility: wire.visibility,
            payload,
            supersedes_event_id: wire.supersedes_event_id,
            actor: wire.actor,
        }
    }
}

impl From<TimelineEvent> for WireEvent {
    fn from(event: TimelineEvent) -> Self {
        Self {
            id: event.id,
            subject_type: event.subject_type,
            subject_id: event.subject_id,
            payload: event.payload.to_value(),
            event_type: event.event_type,
            occurred_at: event.occurred_at,
            visibility: event.visibility,
            supersedes_event_id: event.supersedes_event_id,
            actor: event.actor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse() {
        assert_eq!(EventType::from(COMMENT_CREATED), EventType::CommentCreated);
        assert_eq!(
            EventType::from("rfq.quote_awarded"),
            EventType::Lifecycle(LifecycleEvent::RfqQuoteAwarded)
        );
        for event in LifecycleEvent::ALL {
            assert_eq!(EventType::from(event.as_str()), EventType::Lifecycle(event));
        }
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let event_type = EventType::from("kyc.screening.completed");
        assert!(!event_type.is_recognized());
        assert_eq!(event_type.as_str(), "kyc.screening.completed");
        assert_eq!(event_type.origin(), EventOrigin::Automatic);

        let human = EventType::from("human.reaction.added");
        assert_eq!(human.origin(), EventOrigin::Manual);
    }

    #[test]
    fn visibility_parses_aliases() {
        assert_eq!("finance-restricted".parse::<Visibility>(), Ok(Visibility::Finance));
        assert_eq!(" ALL ".parse::<Visibility>(), Ok(Visibility::All));
        assert!("public".parse::<Visibility>().is_err());
    }

    #[test]
    fn comment_event_deserializes_typed_payload() {
        let event: TimelineEvent = serde_json::from_value(serde_json::json!({
            "id": 5,
            "subject_type": "rfq",
            "subject_id": "RFQ-77",
            "event_type": "human.comment.created",
            "occurred_at": "2026-03-02T10:15:00Z",
            "visibility": "finance",
            "payload": {"body": "Basis looks wide", "mentions": ["alice"], "attachments": [4]},
            "actor": "bob"
        }))
        .unwrap();

        assert_eq!(event.visibility, Visibility::Finance);
        assert_eq!(event.origin(), EventOrigin::Manual);
        let comment = event.comment().unwrap();
        assert_eq!(comment.body, "Basis looks wide");
        assert_eq!(comment.attachments, vec![AttachmentLink::Id(EventId::new(4))]);
        assert!(event.supersedes_event_id.is_none());
    }

    #[test]
    fn malformed_known_payload_is_kept_raw() {
        let event: TimelineEvent = serde_json::from_value(serde_json::json!({
            "id": 6,
            "subject_type": "rfq",
            "subject_id": "RFQ-77",
            "event_type": "human.attachment.added",
            "occurred_at": "2026-03-02T10:15:00Z",
            "payload": {"file_name": "missing-fields.pdf"}
        }))
        .unwrap();

        assert_eq!(event.visibility, Visibility::All);
        assert!(matches!(event.payload, EventPayload::Malformed { .. }));
    }

    #[test]
    fn unrecognized_event_serializes_back_unchanged() {
        let raw = serde_json::json!({
            "id": 8,
            "subject_type": "deal",
            "subject_id": "D-1",
            "event_type": "pnl.recomputed",
            "occurred_at": "2026-03-02T10:15:00Z",
            "visibility": "all",
            "payload": {"delta": "12.5"}
        });
        let event: TimelineEvent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            event.payload,
            EventPayload::Unrecognized(serde_json::json!({"delta": "12.5"}))
        );
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }
}
