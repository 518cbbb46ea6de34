use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use hedgeline_core::{TimelineEvent, Visibility};
use hedgeline_timeline::{EventWindow, TimelineBackend};

use super::{SubjectArgs, compose_failure, read_upload};
use crate::OutputFormat;
use crate::config::Settings;

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,
    /// Comment text. `@handle` and `@name@example.com` become mentions.
    pub body: String,
    /// Who may see the comment: `all` or `finance`.
    #[arg(long, default_value = "all")]
    pub visibility: Visibility,
    /// Files to attach. Each is uploaded before the comment is sent.
    #[arg(long = "attach", value_name = "PATH")]
    pub attachments: Vec<PathBuf>,
}

pub async fn run<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &CommentArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let event = post_comment(backend, settings, args).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        OutputFormat::Text => {
            println!("Comment #{} added to {}", event.id, event.subject());
        }
    }
    Ok(())
}

pub async fn post_comment<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &CommentArgs,
) -> anyhow::Result<TimelineEvent> {
    let locale = settings.locale;
    let mut window = EventWindow::new(backend, args.subject.subject(), settings.page_size);
    let mut composer = window.composer(settings.role, locale);

    composer
        .set_visibility(args.visibility)
        .map_err(|e| compose_failure(e, locale))?;
    composer.set_body(args.body.as_str());

    for path in &args.attachments {
        let upload = read_upload(path, None).await?;
        composer
            .add_attachment(upload, args.visibility)
            .await
            .map_err(|e| compose_failure(e, locale))?;
    }

    composer
        .submit(&mut window)
        .await
        .map_err(|e| compose_failure(e, locale))
}
