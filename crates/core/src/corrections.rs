//! Correction resolution over a loaded window of timeline events.
//!
//! A comment is never edited in place. A correction is a new event whose
//! `supersedes_event_id` points at the earlier event. [`CorrectionIndex`]
//! answers, for every loaded event, which later event currently supersedes
//! it.
//!
//! When several events supersede the same target, the one with the highest
//! id wins (last write by creation order), independent of input order.
//!
//! Resolution only sees the loaded window: a correction whose target is not
//! loaded, or a target whose correction is not loaded yet, produces no
//! entry. The original shows as superseded once both sides are in the
//! window.

use std::collections::HashMap;

use crate::event::TimelineEvent;
use crate::types::EventId;

/// Lookup from original event id to the id of its latest correction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionIndex {
    superseded_by: HashMap<EventId, EventId>,
}

impl CorrectionIndex {
    /// Build the index in a single pass over the loaded events.
    ///
    /// A supersession entry is ignored when the target is not loaded, when
    /// it crosses subjects, or when the corrector's id is not greater than
    /// the target's. The last rule keeps every chain strictly increasing.
    pub fn build(events: &[TimelineEvent]) -> Self {
        let loaded: HashMap<EventId, &TimelineEvent> = events.iter().map(|e| (e.id, e)).collect();

        let mut superseded_by: HashMap<EventId, EventId> = HashMap::new();
        for event in events {
            let Some(target_id) = event.supersedes_event_id else {
                continue;
            };
            let Some(target) = loaded.get(&target_id) else {
                continue;
            };
            if event.id <= target_id || !event.same_subject(target) {
                continue;
            }
            superseded_by
                .entry(target_id)
                .and_modify(|current| {
                    if event.id > *current {
                        *current = event.id;
                    }
                })
                .or_insert(event.id);
        }

        Self { superseded_by }
    }

    /// Id of the event that currently supersedes `id`, if any.
    pub fn superseded_by(&self, id: EventId) -> Option<EventId> {
        self.superseded_by.get(&id).copied()
    }

    pub fn is_superseded(&self, id: EventId) -> bool {
        self.superseded_by.contains_key(&id)
    }

    /// Follow the correction chain from `id` to its newest version.
    ///
    /// Returns `id` itself when it has not been corrected.
    pub fn latest_version(&self, id: EventId) -> EventId {
        let mut current = id;
        while let Some(next) = self.superseded_by(current) {
            current = next;
        }
        current
    }

    /// Number of superseded events in the window.
    pub fn len(&self) -> usize {
        self.superseded_by.len()
    }

    pub fn is_empty(&self) -> bool {
        self.superseded_by.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventId, EventId)> + '_ {
        self.superseded_by.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::event::{CommentPayload, EventPayload, EventType, Visibility};
    use crate::types::{SubjectId, SubjectType};

    fn comment(id: u64, supersedes: Option<u64>) -> TimelineEvent {
        comment_on("rfq", "RFQ-1", id, supersedes)
    }

    fn comment_on(
        subject_type: &str,
        subject_id: &str,
        id: u64,
        supersedes: Option<u64>,
    ) -> TimelineEvent {
        let event_type = if supersedes.is_some() {
            EventType::CommentCorrected
        } else {
            EventType::CommentCreated
        };
        TimelineEvent {
            id: EventId::new(id),
            subject_type: SubjectType::new(subject_type),
            subject_id: SubjectId::new(subject_id),
            event_type,
            occurred_at: Utc::now(),
            visibility: Visibility::All,
            payload: EventPayload::Comment(CommentPayload {
                body: format!("comment {id}"),
                ..CommentPayload::default()
            }),
            supersedes_event_id: supersedes.map(EventId::new),
            actor: Some("trader-1".to_owned()),
        }
    }

    #[test]
    fn later_correction_supersedes_original() {
        let events = vec![comment(1, None), comment(2, Some(1))];
        let index = CorrectionIndex::build(&events);

        assert_eq!(index.superseded_by(EventId::new(1)), Some(EventId::new(2)));
        assert!(!index.is_superseded(EventId::new(2)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn highest_id_wins_regardless_of_order() {
        let ascending = vec![comment(1, None), comment(3, Some(1)), comment(7, Some(1))];
        let shuffled = vec![comment(7, Some(1)), comment(1, None), comment(3, Some(1))];

        for events in [ascending, shuffled] {
            let index = CorrectionIndex::build(&events);
            assert_eq!(index.superseded_by(EventId::new(1)), Some(EventId::new(7)));
        }
    }

    #[test]
    fn correction_of_unloaded_target_is_ignored() {
        let events = vec![comment(10, Some(4)), comment(11, None)];
        let index = CorrectionIndex::build(&events);

        assert!(index.is_empty());
        assert_eq!(index.superseded_by(EventId::new(4)), None);
    }

    #[test]
    fn cross_subject_correction_is_ignored() {
        let events = vec![
            comment_on("rfq", "RFQ-1", 1, None),
            comment_on("deal", "D-9", 2, Some(1)),
        ];
        assert!(CorrectionIndex::build(&events).is_empty());
    }

    #[test]
    fn backward_reference_is_ignored() {
        let events = vec![comment(1, Some(2)), comment(2, None)];
        assert!(CorrectionIndex::build(&events).is_empty());
    }

    #[test]
    fn latest_version_follows_chain() {
        let events = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(5, Some(2)),
            comment(6, None),
        ];
        let index = CorrectionIndex::build(&events);

        assert_eq!(index.latest_version(EventId::new(1)), EventId::new(5));
        assert_eq!(index.latest_version(EventId::new(2)), EventId::new(5));
        assert_eq!(index.latest_version(EventId::new(6)), EventId::new(6));
    }
}
