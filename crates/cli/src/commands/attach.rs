use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use hedgeline_core::{AttachmentRef, Visibility};
use hedgeline_timeline::{Composer, TimelineBackend};

use super::{SubjectArgs, compose_failure, read_upload};
use crate::OutputFormat;
use crate::config::Settings;

#[derive(Args, Debug)]
pub struct AttachArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,
    /// File to upload.
    pub path: PathBuf,
    /// Who may see the attachment: `all` or `finance`.
    #[arg(long, default_value = "all")]
    pub visibility: Visibility,
    /// Mime type. Guessed from the extension when omitted.
    #[arg(long)]
    pub mime: Option<String>,
}

pub async fn run<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &AttachArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let attachment = attach_file(backend, settings, args).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&attachment)?);
        }
        OutputFormat::Text => {
            println!(
                "Attachment #{} {} ({} bytes)",
                attachment.attachment_event_id, attachment.file_name, attachment.size
            );
        }
    }
    Ok(())
}

/// Upload a file and record its attachment event without a comment.
pub async fn attach_file<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &AttachArgs,
) -> anyhow::Result<AttachmentRef> {
    let locale = settings.locale;
    let upload = read_upload(&args.path, args.mime.as_deref()).await?;
    let mut composer = Composer::new(backend, args.subject.subject(), settings.role, locale);
    let attachment = composer
        .add_attachment(upload, args.visibility)
        .await
        .map_err(|e| compose_failure(e, locale))?;
    Ok(attachment.clone())
}
