pub mod attachment;
pub mod corrections;
pub mod error;
pub mod event;
pub mod mentions;
pub mod messages;
pub mod role;
pub mod types;

pub use attachment::{AttachmentLink, AttachmentRef, UploadedFile};
pub use corrections::CorrectionIndex;
pub use error::CoreError;
pub use event::{
    CommentPayload, EventOrigin, EventPayload, EventType, LifecycleEvent, MentionPayload,
    TimelineEvent, Visibility,
};
pub use mentions::extract_mentions;
pub use messages::{Locale, UserMessage};
pub use role::{Role, allowed_visibilities, can_use_finance_visibility, can_write_timeline};
pub use types::{EventId, SubjectId, SubjectRef, SubjectType};
