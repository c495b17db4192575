//! Cursor pagination over label-filtered items.
//!
//! A failure here never ends the run: an empty first page yields an empty
//! result, and an error or exhausted retry mid-way keeps the pages already
//! read.

use crate::corpus::{Corpus, CorpusLine, Record, TrainingItem};
use crate::platform::{BulkItem, ItemKind, Lookup, PlatformClient, short_error_message};
use crate::repository::RepositoryRef;
use crate::retry::retry_empty;

use super::progress::{DownloadProgress, ProgressCallback, emit};
use super::types::{DownloadOptions, LabelFetch};

/// Fetch every item of `kind` carrying `label`.
///
/// `expected` is the authoritative count from the label totals query; it is
/// only used for logging and as the total when no page arrives.
#[tracing::instrument(skip(client, repo, options, on_progress), fields(repo = %repo))]
pub async fn fetch_by_label<C: PlatformClient + ?Sized>(
    client: &C,
    repo: &RepositoryRef,
    label: &str,
    kind: ItemKind,
    expected: u64,
    options: &DownloadOptions,
    on_progress: Option<&ProgressCallback>,
) -> LabelFetch {
    emit(
        on_progress,
        DownloadProgress::FetchingLabel {
            repository: repo.to_string(),
            label: label.to_string(),
            kind,
            expected,
        },
    );

    let mut page_number: u32 = 1;
    let first = retry_empty(
        || client.items_page(repo, label, kind, options.page_size, None),
        options.retry,
        || options.shutdown_requested(),
        |attempt, delay| notify_empty(repo, label, kind, 1, attempt, delay, on_progress),
    )
    .await;

    let first = match first {
        Ok(Some(page)) => page,
        Ok(None) => {
            tracing::warn!(
                label,
                %kind,
                expected,
                "No page returned after retries, skipping label"
            );
            stopped(repo, label, kind, 0, expected, "no page returned", on_progress);
            return LabelFetch {
                items: Vec::new(),
                total_count: expected,
                complete: false,
            };
        }
        Err(e) => {
            tracing::warn!(
                label,
                %kind,
                expected,
                rate_limited = e.is_rate_limited(),
                error = %short_error_message(&e),
                "Failed to fetch first page, skipping label"
            );
            stopped(repo, label, kind, 0, expected, &short_error_message(&e), on_progress);
            return LabelFetch {
                items: Vec::new(),
                total_count: expected,
                complete: false,
            };
        }
    };

    let total_count = first.total_count;
    let mut cursor = first.next_cursor().map(str::to_string);
    let mut items = first.items;
    let mut complete = true;
    page_fetched(repo, label, kind, page_number, items.len(), items.len(), on_progress);

    while let Some(after) = cursor.take() {
        if options.shutdown_requested() {
            tracing::info!(
                label,
                %kind,
                "Shutdown requested, taking {} of {}",
                items.len(),
                total_count
            );
            stopped(
                repo,
                label,
                kind,
                items.len() as u64,
                total_count,
                "shutdown requested",
                on_progress,
            );
            complete = false;
            break;
        }
        page_number += 1;
        let page = retry_empty(
            || client.items_page(repo, label, kind, options.page_size, Some(after.as_str())),
            options.retry,
            || options.shutdown_requested(),
            |attempt, delay| {
                notify_empty(repo, label, kind, page_number, attempt, delay, on_progress)
            },
        )
        .await;

        match page {
            Ok(Some(page)) => {
                cursor = page.next_cursor().map(str::to_string);
                let count = page.items.len();
                items.extend(page.items);
                page_fetched(repo, label, kind, page_number, count, items.len(), on_progress);
            }
            Ok(None) => {
                tracing::warn!(
                    label,
                    %kind,
                    page = page_number,
                    "Taking {} of {} after an empty page; moving on",
                    items.len(),
                    total_count
                );
                stopped(
                    repo,
                    label,
                    kind,
                    items.len() as u64,
                    total_count,
                    "no page returned",
                    on_progress,
                );
                complete = false;
            }
            Err(e) => {
                tracing::warn!(
                    label,
                    %kind,
                    page = page_number,
                    rate_limited = e.is_rate_limited(),
                    error = %short_error_message(&e),
                    "Taking {} of {} after a failed page; moving on",
                    items.len(),
                    total_count
                );
                stopped(
                    repo,
                    label,
                    kind,
                    items.len() as u64,
                    total_count,
                    &short_error_message(&e),
                    on_progress,
                );
                complete = false;
            }
        }
    }

    if kind.is_pull_request() {
        complete_file_lists(client, repo, &mut items).await;
    }

    LabelFetch {
        items,
        total_count,
        complete,
    }
}

/// Replace truncated file lists with the full list from a point lookup.
///
/// On any lookup failure the truncated list is kept.
async fn complete_file_lists<C: PlatformClient + ?Sized>(
    client: &C,
    repo: &RepositoryRef,
    items: &mut [BulkItem],
) {
    for item in items.iter_mut().filter(|i| i.files_truncated) {
        match client.pull_request_files(repo, item.number).await {
            Lookup::Found(files) => {
                item.files = files;
                item.files_truncated = false;
            }
            other => {
                tracing::debug!(
                    number = item.number,
                    outcome = ?other.map(|f| f.len()),
                    "Keeping truncated file list"
                );
            }
        }
    }
}

/// Turn paginated items into corpus entries for one label.
pub fn to_corpus(repo: &RepositoryRef, label: &str, kind: ItemKind, items: &[BulkItem]) -> Corpus {
    let mut corpus = Corpus::new();
    for item in items {
        let key = TrainingItem::new(item.created_at, item.number, repo.name());
        let line = CorpusLine::new(
            &key,
            &Record {
                label,
                title: &item.title,
                body: item.body.as_deref(),
                author: item.author.as_deref(),
                files: kind.is_pull_request().then_some(item.files.as_slice()),
            },
        );
        corpus.insert(key, line);
    }
    corpus
}

fn page_fetched(
    repo: &RepositoryRef,
    label: &str,
    kind: ItemKind,
    page: u32,
    count: usize,
    total_so_far: usize,
    on_progress: Option<&ProgressCallback>,
) {
    tracing::debug!(label, %kind, page, count, total_so_far, "Fetched page");
    emit(
        on_progress,
        DownloadProgress::FetchedPage {
            repository: repo.to_string(),
            label: label.to_string(),
            kind,
            page,
            count,
            total_so_far,
        },
    );
}

fn notify_empty(
    repo: &RepositoryRef,
    label: &str,
    kind: ItemKind,
    page: u32,
    attempt: u32,
    delay: std::time::Duration,
    on_progress: Option<&ProgressCallback>,
) {
    tracing::debug!(label, %kind, page, attempt, ?delay, "Empty page, retrying");
    emit(
        on_progress,
        DownloadProgress::EmptyPageRetry {
            repository: repo.to_string(),
            label: label.to_string(),
            kind,
            page,
            retry_after_ms: delay.as_millis() as u64,
            attempt,
        },
    );
}

fn stopped(
    repo: &RepositoryRef,
    label: &str,
    kind: ItemKind,
    retrieved: u64,
    expected: u64,
    reason: &str,
    on_progress: Option<&ProgressCallback>,
) {
    emit(
        on_progress,
        DownloadProgress::PaginationStopped {
            repository: repo.to_string(),
            label: label.to_string(),
            kind,
            retrieved,
            expected,
            reason: reason.to_string(),
        },
    );
}
