use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use console::{Term, style};
use labeler::corpus::Corpus;
use labeler::download::{DownloadOptions, DownloadReport, PipelineController, check_preconditions};
use labeler::github::GitHubClient;
use labeler::{MatchMode, PlatformClient, RateLimitedClient, RepositoryRef};

use crate::commands::{display_rate_limit, parse_repositories, require_token};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::shutdown_flag;

#[derive(Debug, Args)]
pub(crate) struct DownloadArgs {
    /// Repositories to download, as owner/name
    #[arg(required = true, value_name = "OWNER/NAME")]
    pub repos: Vec<String>,

    /// Corpus file to write (default: <owner>-<name>-issues.tsv for the first repository)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Existing corpus whose entries are kept and not downloaded again
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Whether a label must match every label type or any of them
    #[arg(long = "match", value_name = "MODE")]
    pub match_mode: Option<MatchMode>,

    /// Disable proactive request pacing
    #[arg(short = 'R', long)]
    pub no_rate_limit: bool,
}

/// Handle the download command.
pub(crate) async fn handle_download(
    args: DownloadArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let repos = parse_repositories(&args.repos)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&repos));

    let token = require_token(config)?;
    check_preconditions(&token, &repos, &output)?;

    let mut corpus = match args.seed {
        Some(ref seed) => load_seed(seed)?,
        None => Corpus::new(),
    };

    let options = DownloadOptions {
        shutdown: Some(shutdown_flag()),
        ..config.download_options(args.match_mode)
    };

    let is_tty = Term::stdout().is_term();
    let github = GitHubClient::new(&token)?;

    let report = if args.no_rate_limit {
        if is_tty {
            eprintln!("Warning: Rate limiting disabled - you may experience API throttling\n");
        }
        run(&github, &repos, options, &output, &mut corpus, is_tty).await?
    } else {
        let client = RateLimitedClient::new(github, config.github.requests_per_second);
        run(&client, &repos, options, &output, &mut corpus, is_tty).await?
    };

    print_summary(&report, &output, is_tty);
    Ok(())
}

async fn run<C: PlatformClient + ?Sized>(
    client: &C,
    repos: &[RepositoryRef],
    options: DownloadOptions,
    output: &Path,
    corpus: &mut Corpus,
    is_tty: bool,
) -> Result<DownloadReport, Box<dyn std::error::Error>> {
    display_rate_limit(client, is_tty).await;

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let controller = PipelineController::new(client, options, output);
    let result = controller.run(repos, corpus, Some(&callback)).await;
    reporter.finish();

    match result {
        Ok(report) => Ok(report),
        Err(e) => {
            if is_tty {
                eprintln!(
                    "{} Download failed, {} entries written to {}",
                    style("✗").red(),
                    corpus.len(),
                    output.display()
                );
            }
            Err(e.into())
        }
    }
}

/// `<owner>-<name>-issues.tsv` for the first repository of the group.
pub(crate) fn default_output(repos: &[RepositoryRef]) -> PathBuf {
    match repos.first() {
        Some(repo) => PathBuf::from(format!("{}-issues.tsv", repo.file_prefix())),
        None => PathBuf::from("issues.tsv"),
    }
}

fn load_seed(path: &Path) -> Result<Corpus, Box<dyn std::error::Error>> {
    let corpus = Corpus::load(path)
        .map_err(|e| format!("Failed to load seed corpus {}: {}", path.display(), e))?;
    tracing::info!(path = %path.display(), entries = corpus.len(), "Loaded seed corpus");
    Ok(corpus)
}

fn print_summary(report: &DownloadReport, output: &Path, is_tty: bool) {
    let elapsed = report.elapsed.as_secs_f64();
    if !is_tty {
        tracing::info!(
            entries = report.entries,
            missing_issues = report.missing_issues(),
            missing_pull_requests = report.missing_pull_requests(),
            resolved = report.resolved(),
            interrupted = report.interrupted,
            elapsed_secs = elapsed,
            path = %output.display(),
            "Download complete"
        );
        return;
    }

    println!();
    if report.interrupted {
        println!(
            "{} Interrupted, partial corpus written",
            style("!").yellow().bold()
        );
    } else {
        println!("{} Download complete", style("✓").green().bold());
    }
    println!("  Output:          {}", output.display());
    println!("  Entries:         {}", report.entries);
    println!(
        "  Missing:         {} issues, {} pull requests",
        report.missing_issues(),
        report.missing_pull_requests()
    );
    println!("  Resolved:        {}", report.resolved());
    for repo in &report.repositories {
        for (label, kind) in &repo.incomplete_labels {
            println!(
                "  {} {}: '{}' {} stopped early",
                style("!").yellow(),
                repo.repository,
                label,
                kind
            );
        }
    }
    println!("  Elapsed:         {:.1}s", elapsed);
}
