//! Hedgeline CLI
//!
//! A command-line interface for reading and writing subject timelines.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use hedgeline_core::{Locale, Role};

use config::{Overrides, Profile, Settings};

/// Hedgeline CLI: read and annotate the timeline of RFQs, deals and orders.
#[derive(Parser, Debug)]
#[command(name = "hedgeline", version, about)]
struct Cli {
    /// TOML profile with endpoint, api_key, timeout_secs, role, locale and
    /// page_size. Flags and environment variables take precedence.
    #[arg(long, env = "HEDGELINE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Backend endpoint URL.
    #[arg(long, env = "HEDGELINE_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// API key for authentication.
    #[arg(long, env = "HEDGELINE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "HEDGELINE_TIMEOUT_SECS", global = true)]
    timeout: Option<u64>,

    /// Role used for capability checks (`viewer` can only read).
    #[arg(long, env = "HEDGELINE_ROLE", global = true)]
    role: Option<Role>,

    /// Language of user-facing messages (`en`, `es`).
    #[arg(long, env = "HEDGELINE_LOCALE", global = true)]
    locale: Option<Locale>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a subject's timeline.
    List(commands::list::ListArgs),
    /// Add a comment, optionally with attachments.
    Comment(commands::comment::CommentArgs),
    /// Correct an earlier comment.
    Correct(commands::correct::CorrectArgs),
    /// Attach a file without a comment.
    Attach(commands::attach::AttachArgs),
    /// Download an attachment.
    Download(commands::download::DownloadArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let profile = match &cli.config {
        Some(path) => Profile::load(path)?,
        None => Profile::default(),
    };
    let settings = Settings::resolve(
        profile,
        Overrides {
            endpoint: cli.endpoint.clone(),
            api_key: cli.api_key.clone(),
            timeout_secs: cli.timeout,
            role: cli.role,
            locale: cli.locale,
        },
    );
    tracing::debug!(
        endpoint = %settings.client.endpoint,
        role = %settings.role,
        "settings resolved"
    );

    let client = Arc::new(settings.client.build_client()?);

    match cli.command {
        Command::List(args) => commands::list::run(client, &settings, &args, &cli.format).await,
        Command::Comment(args) => {
            commands::comment::run(client, &settings, &args, &cli.format).await
        }
        Command::Correct(args) => {
            commands::correct::run(client, &settings, &args, &cli.format).await
        }
        Command::Attach(args) => commands::attach::run(client, &settings, &args, &cli.format).await,
        Command::Download(args) => {
            commands::download::run(client, &settings, &args, &cli.format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hedgeline",
            "comment",
            "rfq",
            "RFQ-1",
            "looks good @risk.desk",
            "--role",
            "trader",
            "--visibility",
            "finance",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.role, Some(Role::Trader));
        assert!(matches!(cli.format, OutputFormat::Json));
        let Command::Comment(args) = cli.command else {
            panic!("expected comment");
        };
        assert_eq!(args.body, "looks good @risk.desk");
        assert_eq!(args.visibility, hedgeline_core::Visibility::Finance);
    }

    #[test]
    fn rejects_unknown_role() {
        let parsed = Cli::try_parse_from(["hedgeline", "--role", "intern", "list", "rfq", "R"]);
        assert!(parsed.is_err());
    }
}
