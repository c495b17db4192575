//! Recover items the bulk path missed, one point lookup at a time.
//!
//! Candidates are items known to carry a label of interest (from the full
//! issue listing) that are not yet in the corpus. Each candidate is fetched
//! by number and its labels are checked again before it becomes a corpus
//! entry, one per qualifying label.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::corpus::{Corpus, CorpusLine, Record, TrainingItem};
use crate::label::{FilterError, InterestFilter};
use crate::platform::{IssueDetail, IssueSummary, Lookup, PlatformClient};
use crate::repository::RepositoryRef;

use super::progress::{DownloadProgress, ProgressCallback, emit};
use super::types::{DownloadOptions, ResolveStats};

/// Longest single sleep while waiting for a rate limit reset.
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// Numbers of the listed items that carry at least one label of interest.
///
/// Items whose URL does not point into `repo` (transferred issues) are still
/// counted but reported as a warning.
pub fn interest_set(
    repo: &RepositoryRef,
    issues: &[IssueSummary],
    filter: &InterestFilter,
    on_progress: Option<&ProgressCallback>,
) -> Result<BTreeSet<u64>, FilterError> {
    let mut numbers = BTreeSet::new();
    let needle = repo.name().to_ascii_lowercase();

    for issue in issues {
        if filter.select(&issue.labels)?.is_empty() {
            continue;
        }
        if !issue.html_url.to_ascii_lowercase().contains(&needle) {
            tracing::warn!(
                repo = %repo,
                number = issue.number,
                url = %issue.html_url,
                "Unexpected item in listing, please investigate"
            );
            emit(
                on_progress,
                DownloadProgress::Warning {
                    message: format!(
                        "{repo}: #{} lists as {}, please investigate",
                        issue.number, issue.html_url
                    ),
                },
            );
        }
        numbers.insert(issue.number);
    }

    Ok(numbers)
}

/// Interest set minus skip set, ascending.
pub fn candidates(skip: &BTreeSet<u64>, interest: &BTreeSet<u64>) -> Vec<u64> {
    interest.difference(skip).copied().collect()
}

/// How long to wait before retrying after a rate limit that resets at `reset_at`.
///
/// The wait ends `buffer` after the reset; a reset already that far in the
/// past means no wait.
pub fn resume_delay(reset_at: DateTime<Utc>, now: DateTime<Utc>, buffer: Duration) -> Duration {
    let until_reset = reset_at.signed_duration_since(now);
    match until_reset.to_std() {
        Ok(ahead) => ahead + buffer,
        Err(_) => buffer.saturating_sub((-until_reset).to_std().unwrap_or_default()),
    }
}

/// Sleep for `delay`, waking early if shutdown is requested.
///
/// Returns `false` when interrupted.
async fn wait_for_reset(delay: Duration, options: &DownloadOptions) -> bool {
    if options.shutdown.is_none() {
        tokio::time::sleep(delay).await;
        return true;
    }

    let deadline = tokio::time::Instant::now() + delay;
    loop {
        if options.shutdown_requested() {
            return false;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return true;
        }
        tokio::time::sleep((deadline - now).min(WAIT_SLICE)).await;
    }
}

enum Step {
    /// Move to the next candidate.
    Advance,
    /// Try the same candidate again.
    Retry,
    /// Stop the whole pass.
    Stop,
}

/// Fetch each candidate by number and build corpus entries for it.
///
/// Candidates present in `skip` or absent from `interest` are passed over.
/// Not-found and unexpected errors skip a single candidate; a rate limit
/// waits for the reset (plus the configured buffer) and retries the same
/// candidate.
#[tracing::instrument(skip_all, fields(repo = %repo, candidates = candidates.len()))]
pub async fn resolve<C: PlatformClient + ?Sized>(
    client: &C,
    repo: &RepositoryRef,
    skip: &BTreeSet<u64>,
    interest: &BTreeSet<u64>,
    candidates: &[u64],
    options: &DownloadOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<(Corpus, ResolveStats), FilterError> {
    let mut corpus = Corpus::new();
    let mut stats = ResolveStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    let every = options.progress_every.max(1);

    let mut index = 0;
    while index < candidates.len() {
        if options.shutdown_requested() {
            emit(on_progress, DownloadProgress::Interrupted);
            break;
        }

        let number = candidates[index];
        if skip.contains(&number) || !interest.contains(&number) {
            index += 1;
            continue;
        }

        let step = resolve_one(client, repo, number, options, &mut corpus, &mut stats, on_progress)
            .await?;

        match step {
            Step::Retry => continue,
            Step::Stop => {
                emit(on_progress, DownloadProgress::Interrupted);
                break;
            }
            Step::Advance => {}
        }

        index += 1;
        stats.processed += 1;
        if stats.processed % every == 0 {
            tracing::info!(
                processed = stats.processed,
                total = candidates.len(),
                "Downloading missing items"
            );
            emit(
                on_progress,
                DownloadProgress::ResolveProgress {
                    repository: repo.to_string(),
                    processed: stats.processed,
                    total: candidates.len(),
                },
            );
        }
    }

    tracing::info!(
        resolved = stats.resolved,
        not_found = stats.not_found,
        failed = stats.failed,
        discarded = stats.discarded,
        "Downloaded missing items"
    );
    emit(
        on_progress,
        DownloadProgress::ResolveComplete {
            repository: repo.to_string(),
            resolved: stats.resolved,
            not_found: stats.not_found,
            failed: stats.failed,
        },
    );

    Ok((corpus, stats))
}

async fn resolve_one<C: PlatformClient + ?Sized>(
    client: &C,
    repo: &RepositoryRef,
    number: u64,
    options: &DownloadOptions,
    corpus: &mut Corpus,
    stats: &mut ResolveStats,
    on_progress: Option<&ProgressCallback>,
) -> Result<Step, FilterError> {
    let detail = match client.fetch_item(repo, number).await {
        Lookup::Found(detail) => detail,
        other => return Ok(handle_miss(repo, number, other, options, stats, on_progress).await),
    };

    let labels: Vec<&str> = options
        .filter
        .select(&detail.labels)?
        .into_iter()
        .map(|l| l.name.as_str())
        .collect();

    if labels.is_empty() {
        tracing::debug!(number, "No labels of interest left, discarding");
        stats.discarded += 1;
        return Ok(Step::Advance);
    }

    let files = if detail.is_pull_request {
        match client.pull_request_files(repo, number).await {
            Lookup::Found(files) => Some(files),
            other => return Ok(handle_miss(repo, number, other, options, stats, on_progress).await),
        }
    } else {
        None
    };

    insert_entries(repo, &detail, &labels, files.as_deref(), corpus, stats);
    Ok(Step::Advance)
}

async fn handle_miss<T>(
    repo: &RepositoryRef,
    number: u64,
    outcome: Lookup<T>,
    options: &DownloadOptions,
    stats: &mut ResolveStats,
    on_progress: Option<&ProgressCallback>,
) -> Step {
    match outcome {
        Lookup::Found(_) => Step::Advance,
        Lookup::NotFound => {
            tracing::warn!(number, "Item not found, skipping");
            stats.not_found += 1;
            emit(
                on_progress,
                DownloadProgress::ItemSkipped {
                    repository: repo.to_string(),
                    number,
                    reason: "not found".to_string(),
                },
            );
            Step::Advance
        }
        Lookup::RateLimited { reset_at } => {
            let delay = resume_delay(reset_at, Utc::now(), options.rate_limit_buffer);
            tracing::info!(
                number,
                %reset_at,
                wait_secs = delay.as_secs(),
                "Rate limit exceeded, waiting for reset"
            );
            stats.rate_limit_waits += 1;
            emit(
                on_progress,
                DownloadProgress::RateLimitBackoff {
                    repository: repo.to_string(),
                    number,
                    retry_after_ms: delay.as_millis() as u64,
                },
            );
            if wait_for_reset(delay, options).await {
                Step::Retry
            } else {
                Step::Stop
            }
        }
        Lookup::TransientError(message) => {
            tracing::warn!(number, error = %message, "Failed to fetch item, skipping");
            stats.failed += 1;
            emit(
                on_progress,
                DownloadProgress::ItemSkipped {
                    repository: repo.to_string(),
                    number,
                    reason: message,
                },
            );
            Step::Advance
        }
    }
}

/// One entry per qualifying label, all under the same key. Only the first
/// label that reaches the corpus is kept.
fn insert_entries(
    repo: &RepositoryRef,
    detail: &IssueDetail,
    labels: &[&str],
    files: Option<&[String]>,
    corpus: &mut Corpus,
    stats: &mut ResolveStats,
) {
    for label in labels {
        let key = TrainingItem::new(detail.created_at, detail.number, repo.name());
        let line = CorpusLine::new(
            &key,
            &Record {
                label,
                title: &detail.title,
                body: detail.body.as_deref(),
                author: detail.author.as_deref(),
                files,
            },
        );
        if corpus.insert(key, line) {
            stats.resolved += 1;
        } else {
            stats.duplicate_labels += 1;
        }
    }
}
