//! Client-side model of a subject's append-only timeline.
//!
//! A [`TimelineBackend`] is the source of truth. An [`EventWindow`] holds
//! the loaded portion of one subject's log, a [`Composer`] or
//! [`CorrectionEditor`] stages writes, and [`render`] turns a window into
//! display entries.

pub mod backend;
pub mod backfill;
pub mod composer;
pub mod editor;
pub mod error;
pub mod render;
pub mod request;
pub mod testing;
pub mod window;

pub use backend::TimelineBackend;
pub use backfill::{AttachmentCatalog, BackfillReport, backfill_attachments};
pub use composer::Composer;
pub use editor::CorrectionEditor;
pub use error::{BackendError, ComposeError, WindowError};
pub use render::{EntryFlag, RenderedEntry, TimelineView, render};
pub use request::{
    DEFAULT_PAGE_SIZE, DownloadedFile, EventPage, EventQuery, FileUpload, MAX_PAGE_SIZE,
    NewAttachment, NewComment, NewCorrection, effective_limit,
};
pub use window::EventWindow;
