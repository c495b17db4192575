use labeler::download::DownloadProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: DownloadProgress) {
        match event {
            DownloadProgress::RepositoryStarted {
                repository,
                index,
                total,
            } => {
                tracing::info!(repo = %repository, index, total, "Downloading repository");
            }

            DownloadProgress::LabelsFetched {
                repository,
                total,
                of_interest,
            } => {
                tracing::debug!(repo = %repository, total, of_interest, "Labels fetched");
            }

            DownloadProgress::FetchingLabel {
                repository,
                label,
                kind,
                expected,
            } => {
                tracing::debug!(repo = %repository, label = %label, %kind, expected, "Fetching label");
            }

            DownloadProgress::FetchedPage {
                repository,
                label,
                page,
                count,
                total_so_far,
                ..
            } => {
                tracing::trace!(repo = %repository, label = %label, page, count, total_so_far, "Fetched page");
            }

            DownloadProgress::EmptyPageRetry {
                repository,
                label,
                page,
                retry_after_ms,
                attempt,
                ..
            } => {
                tracing::debug!(
                    repo = %repository,
                    label = %label,
                    page,
                    retry_after_ms,
                    attempt,
                    "Empty page, retrying"
                );
            }

            DownloadProgress::PaginationStopped {
                repository,
                label,
                kind,
                retrieved,
                expected,
                reason,
            } => {
                tracing::warn!(
                    repo = %repository,
                    label = %label,
                    %kind,
                    retrieved,
                    expected,
                    reason = %reason,
                    "Pagination stopped early"
                );
            }

            DownloadProgress::LabelComplete { .. } => {}

            DownloadProgress::ResolvingMissing {
                repository,
                missing_issues,
                missing_pull_requests,
                candidates,
            } => {
                tracing::info!(
                    repo = %repository,
                    missing_issues,
                    missing_pull_requests,
                    candidates,
                    "Resolving missing items"
                );
            }

            DownloadProgress::ResolveProgress {
                repository,
                processed,
                total,
            } => {
                tracing::debug!(repo = %repository, processed, total, "Resolve progress");
            }

            DownloadProgress::RateLimitBackoff {
                repository,
                number,
                retry_after_ms,
            } => {
                tracing::warn!(
                    repo = %repository,
                    number,
                    retry_after_ms,
                    "Rate limited, backing off"
                );
            }

            DownloadProgress::ItemSkipped {
                repository,
                number,
                reason,
            } => {
                tracing::debug!(repo = %repository, number, reason = %reason, "Skipped item");
            }

            DownloadProgress::ResolveComplete {
                repository,
                resolved,
                not_found,
                failed,
            } => {
                tracing::info!(repo = %repository, resolved, not_found, failed, "Resolve complete");
            }

            DownloadProgress::RepositoryComplete {
                repository,
                entries,
            } => {
                tracing::info!(repo = %repository, entries, "Repository complete");
            }

            DownloadProgress::Interrupted => {
                tracing::warn!("Interrupted, writing partial corpus");
            }

            DownloadProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
