//! Labeler CLI - builds labeled issue and pull request corpora from GitHub.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::download::DownloadArgs;
use crate::commands::labels::LabelsArgs;
use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "labeler")]
#[command(version)]
#[command(about = "Build labeled training corpora from GitHub issues and pull requests")]
#[command(
    long_about = "Labeler downloads every issue and pull request carrying a label of interest \
from a group of GitHub repositories and writes them as a tab-separated training corpus. \
Labels are selected by color. Items the bulk label queries fail to return are looked up \
one by one so the corpus matches the counts GitHub reports."
)]
#[command(after_long_help = r#"EXAMPLES
    Download two repositories into one corpus:
        $ labeler download octo/widgets octo/gadgets

    Write to a chosen file and keep entries from an earlier run:
        $ labeler download octo/widgets -o widgets.tsv --seed old-widgets.tsv

    Require labels to match every label type:
        $ labeler download octo/widgets --match all

    See which labels would be downloaded:
        $ labeler labels octo/widgets --all

CONFIGURATION
    Labeler reads configuration from:
      1. ~/.config/labeler/config.toml (or $XDG_CONFIG_HOME/labeler/config.toml)
      2. ./labeler.toml
      3. Environment variables (LABELER_* prefix, e.g., LABELER_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    LABELER_GITHUB_TOKEN      GitHub personal access token
    LABELER_LABELS_MATCH      Label type matching: any (default) or all
    RUST_LOG                  Log filter (default: labeler=info,labeler_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download labeled issues and pull requests into a corpus file
    Download(DownloadArgs),
    /// List a repository's labels and whether each is of interest
    Labels(LabelsArgs),
    /// Show GitHub API rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Ctrl+C stops the download, the corpus is still written
    shutdown::setup_shutdown_handler();

    // Structured logging only when not attached to a terminal
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("labeler=info,labeler_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download(args) => commands::download::handle_download(args, &config).await?,
        Commands::Labels(args) => commands::labels::handle_labels(args, &config).await?,
        Commands::Limits { output } => commands::limits::handle_limits(output, &config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use labeler::MatchMode;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn download_parses_flags() {
        let cli = Cli::try_parse_from([
            "labeler",
            "download",
            "octo/widgets",
            "octo/gadgets",
            "-o",
            "out.tsv",
            "--match",
            "all",
            "-R",
        ])
        .unwrap();

        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.repos, vec!["octo/widgets", "octo/gadgets"]);
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.tsv")));
                assert_eq!(args.match_mode, Some(MatchMode::All));
                assert!(args.no_rate_limit);
                assert!(args.seed.is_none());
            }
            _ => panic!("expected download"),
        }
    }

    #[test]
    fn download_requires_a_repository() {
        assert!(Cli::try_parse_from(["labeler", "download"]).is_err());
    }

    #[test]
    fn labels_rejects_unknown_match_mode() {
        assert!(Cli::try_parse_from(["labeler", "labels", "octo/widgets", "--match", "most"]).is_err());
    }
}
