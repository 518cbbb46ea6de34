use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use hedgeline_core::{EventId, UserMessage};
use hedgeline_timeline::TimelineBackend;

use crate::OutputFormat;
use crate::config::Settings;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Id of the attachment event.
    pub attachment_event_id: EventId,
    /// Destination file or directory. Defaults to the server's file name in
    /// the current directory.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Saved {
    path: PathBuf,
    file_name: String,
    mime: Option<String>,
    size: usize,
}

pub async fn run<B: TimelineBackend + ?Sized>(
    backend: Arc<B>,
    settings: &Settings,
    args: &DownloadArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let file = backend
        .download_attachment(args.attachment_event_id)
        .await
        .context(UserMessage::DownloadFailed.text(settings.locale))?;

    let path = output_path(args.output.as_deref(), &file.file_name);
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    let saved = Saved {
        path,
        file_name: file.file_name,
        mime: file.mime,
        size: file.bytes.len(),
    };
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        OutputFormat::Text => {
            println!("Saved {} ({} bytes)", saved.path.display(), saved.size);
        }
    }
    Ok(())
}

/// Where to write a download: into `output` when it is a directory, at
/// `output` otherwise, or under the server's name in the current directory.
fn output_path(output: Option<&Path>, file_name: &str) -> PathBuf {
    match output {
        Some(dir) if dir.is_dir() => dir.join(file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(file_name),
    }
}
