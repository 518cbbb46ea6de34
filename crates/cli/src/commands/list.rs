use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use hedgeline_timeline::{
    AttachmentCatalog, RenderedEntry, TimelineBackend, TimelineView, backfill_attachments, render,
};

use super::{SubjectArgs, load_window};
use crate::OutputFormat;
use crate::config::Settings;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,
    /// Page size. Defaults to the profile's `page_size`.
    #[arg(long)]
    pub limit: Option<u32>,
    /// Follow `has_more` until the whole timeline is loaded.
    #[arg(long)]
    pub all: bool,
    /// Do not fetch metadata of attachments referenced outside the window.
    #[arg(long)]
    pub no_backfill: bool,
}

/// A rendered window and whether the server has more events.
#[derive(Debug, serde::Serialize)]
pub struct Listing {
    #[serde(flatten)]
    pub view: TimelineView,
    pub has_more: bool,
}

pub async fn run<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &ListArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });

    let listing = load_listing(backend, settings, args, &cancel).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            println!("Timeline {}", args.subject.subject());
            print_group("Automatic", &listing.view.automatic);
            print_group("Manual", &listing.view.manual);
            let flagged = listing.view.flagged().count();
            if flagged > 0 {
                println!("{flagged} entries could not be fully displayed.");
            }
            if listing.has_more {
                println!("More events available; pass --all to load them.");
            }
        }
    }
    Ok(())
}

/// Load, backfill and render one subject's timeline.
pub async fn load_listing<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &ListArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<Listing> {
    let limit = args.limit.unwrap_or(settings.page_size);
    let window = load_window(
        Arc::clone(&backend),
        args.subject.subject(),
        limit,
        args.all,
        settings.locale,
    )
    .await?;

    let mut catalog = AttachmentCatalog::from_events(window.events());
    if !args.no_backfill {
        let missing = catalog.missing_ids(window.events());
        if !missing.is_empty() {
            let report =
                backfill_attachments(backend.as_ref(), &mut catalog, &missing, cancel).await;
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "some attachment names are unavailable");
            }
        }
    }

    Ok(Listing {
        view: render(window.events(), window.corrections(), &catalog),
        has_more: window.has_more(),
    })
}

fn print_group(title: &str, entries: &[RenderedEntry]) {
    println!("{title} ({})", entries.len());
    for entry in entries {
        println!("  {entry}");
    }
}

#[cfg(test)]
mod tests {
    use hedgeline_core::{SubjectRef, Visibility};
    use hedgeline_timeline::{FileUpload, NewAttachment, NewComment, NewCorrection};
    use hedgeline_timeline_memory::MemoryTimelineBackend;

    use super::*;
    use crate::config::{Overrides, Profile};

    fn settings() -> Settings {
        Settings::resolve(Profile::default(), Overrides::default())
    }

    fn args(all: bool, limit: u32) -> ListArgs {
        ListArgs {
            subject: SubjectArgs {
                subject_type: "rfq".into(),
                subject_id: "RFQ-9".into(),
            },
            limit: Some(limit),
            all,
            no_backfill: false,
        }
    }

    fn comment(subject: &SubjectRef, body: &str, attachments: Vec<u64>) -> NewComment {
        NewComment {
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            body: body.into(),
            visibility: Visibility::All,
            mentions: vec![],
            attachments: attachments.into_iter().map(Into::into).collect(),
        }
    }

    #[tokio::test]
    async fn lists_superseded_comment_and_backfills_attachment_name() {
        let backend = Arc::new(MemoryTimelineBackend::new().with_actor("jdoe"));
        let subject = SubjectRef::new("rfq", "RFQ-9");

        let uploaded = backend
            .upload_file(&subject, &FileUpload::new("quote.pdf", "application/pdf", vec![1, 2]))
            .await
            .unwrap();
        let attachment = backend
            .create_attachment_event(&NewAttachment {
                subject_type: subject.subject_type.clone(),
                subject_id: subject.subject_id.clone(),
                file: uploaded,
                visibility: Visibility::All,
            })
            .await
            .unwrap();
        let original = backend
            .create_comment(&comment(&subject, "bid 18.10", vec![attachment.id.get()]))
            .await
            .unwrap();
        backend
            .create_correction(&NewCorrection {
                supersedes_event_id: original.id,
                body: "bid 18.20".into(),
                mentions: vec![],
                attachments: vec![],
            })
            .await
            .unwrap();

        // The attachment event falls outside a one-event first page.
        let listing = load_listing(
            Arc::clone(&backend),
            &settings(),
            &args(false, 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(listing.has_more);
        assert_eq!(listing.view.len(), 1);

        let listing = load_listing(backend, &settings(), &args(true, 1), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!listing.has_more);
        let manual = &listing.view.manual;
        assert_eq!(manual.len(), 3);
        assert_eq!(manual[1].superseded_by, Some(manual[2].id));
        assert_eq!(manual[1].attachments, vec!["quote.pdf".to_string()]);
    }

    #[tokio::test]
    async fn unknown_subject_lists_nothing() {
        let backend = Arc::new(MemoryTimelineBackend::new());
        let listing =
            load_listing(backend, &settings(), &args(true, 10), &CancellationToken::new())
                .await
                .unwrap();
        assert!(listing.view.is_empty());
        assert!(!listing.has_more);
    }
}
