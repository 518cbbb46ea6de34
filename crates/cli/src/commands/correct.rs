use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use hedgeline_core::{EventId, TimelineEvent};
use hedgeline_timeline::TimelineBackend;

use super::{SubjectArgs, compose_failure, load_window, read_upload};
use crate::OutputFormat;
use crate::config::Settings;

#[derive(Args, Debug)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,
    /// Id of the comment to correct.
    pub event_id: EventId,
    /// Replacement text. Defaults to the comment's current text, which
    /// allows correcting only the attachments.
    #[arg(long)]
    pub body: Option<String>,
    /// Extra files to attach to the correction.
    #[arg(long = "attach", value_name = "PATH")]
    pub attachments: Vec<PathBuf>,
    /// Attachment event ids to drop from the corrected comment.
    #[arg(long = "detach", value_name = "ID")]
    pub detach: Vec<EventId>,
}

pub async fn run<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &CorrectArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let event = post_correction(backend, settings, args).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        OutputFormat::Text => {
            println!("Correction #{} supersedes #{}", event.id, args.event_id);
        }
    }
    Ok(())
}

pub async fn post_correction<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &CorrectArgs,
) -> anyhow::Result<TimelineEvent> {
    let locale = settings.locale;
    // The target must be loaded, so read the whole timeline.
    let mut window = load_window(
        backend,
        args.subject.subject(),
        settings.page_size,
        true,
        locale,
    )
    .await?;

    let mut editor = window
        .correction_editor(args.event_id, settings.role, locale)
        .map_err(|e| compose_failure(e, locale))?;

    if let Some(body) = &args.body {
        editor.set_body(body.as_str());
    }
    for id in &args.detach {
        if !editor.remove_attachment(*id) {
            anyhow::bail!("attachment #{id} is not on comment #{}", args.event_id);
        }
    }
    for path in &args.attachments {
        let upload = read_upload(path, None).await?;
        editor
            .add_attachment(upload)
            .await
            .map_err(|e| compose_failure(e, locale))?;
    }

    editor
        .submit(&mut window)
        .await
        .map_err(|e| compose_failure(e, locale))
}
