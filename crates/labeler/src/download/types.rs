//! Download options, reports, errors and defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::corpus::CorpusError;
use crate::label::{FilterError, InterestFilter};
use crate::platform::{ItemKind, PlatformError};
use crate::retry::RetryConfig;

/// Items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Retries after an empty page response.
pub const DEFAULT_EMPTY_RETRIES: usize = 5;

/// Delay between empty page retries, in seconds.
pub const DEFAULT_EMPTY_RETRY_DELAY_SECS: u64 = 5;

/// Extra wait after a rate limit reset, in seconds.
pub const DEFAULT_RATE_LIMIT_BUFFER_SECS: u64 = 60;

/// Resolver progress is reported every this many candidates.
pub const DEFAULT_PROGRESS_EVERY: usize = 100;

/// Options for a download run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Decides which labels are downloaded.
    pub filter: InterestFilter,
    /// Items requested per page.
    pub page_size: u32,
    /// Empty page retry policy.
    pub retry: RetryConfig,
    /// Added to a rate limit reset time before resuming.
    pub rate_limit_buffer: Duration,
    /// Resolver progress cadence.
    pub progress_every: usize,
    /// Set from outside to stop the run at the next unit of work.
    pub shutdown: Option<Arc<AtomicBool>>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            filter: InterestFilter::default(),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryConfig::default(),
            rate_limit_buffer: Duration::from_secs(DEFAULT_RATE_LIMIT_BUFFER_SECS),
            progress_every: DEFAULT_PROGRESS_EVERY,
            shutdown: None,
        }
    }
}

impl DownloadOptions {
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }
}

/// Result of paginating one label for one item kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFetch {
    pub items: Vec<crate::platform::BulkItem>,
    /// Total reported by the platform, or the expected count if no page arrived.
    pub total_count: u64,
    /// Every page was retrieved.
    pub complete: bool,
}

impl LabelFetch {
    /// Distinct item numbers retrieved.
    pub fn retrieved(&self) -> u64 {
        let mut numbers: Vec<u64> = self.items.iter().map(|i| i.number).collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers.len() as u64
    }
}

/// Counters from one resolver pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Candidates handed to the resolver.
    pub candidates: usize,
    /// Candidates actually looked up.
    pub processed: usize,
    /// Corpus entries produced.
    pub resolved: usize,
    /// Extra qualifying labels that collided with an existing key.
    pub duplicate_labels: usize,
    /// Items that no longer exist.
    pub not_found: usize,
    /// Items whose labels no longer qualify.
    pub discarded: usize,
    /// Items skipped after an unexpected error.
    pub failed: usize,
    /// Times the resolver waited for a rate limit reset.
    pub rate_limit_waits: usize,
}

/// Summary for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryReport {
    pub repository: String,
    /// Labels that passed the interest filter.
    pub labels_of_interest: usize,
    /// Entries added from bulk pages.
    pub bulk_entries: usize,
    pub missing_issues: u64,
    pub missing_pull_requests: u64,
    /// Present when the resolver ran.
    pub resolve: Option<ResolveStats>,
    /// (label, kind) pairs whose pagination stopped early.
    pub incomplete_labels: Vec<(String, ItemKind)>,
}

/// Summary of a whole download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub repositories: Vec<RepositoryReport>,
    /// Entries in the corpus when the run ended.
    pub entries: usize,
    pub elapsed: Duration,
    /// The run stopped on a shutdown request.
    pub interrupted: bool,
}

impl DownloadReport {
    pub fn missing_issues(&self) -> u64 {
        self.repositories.iter().map(|r| r.missing_issues).sum()
    }

    pub fn missing_pull_requests(&self) -> u64 {
        self.repositories.iter().map(|r| r.missing_pull_requests).sum()
    }

    /// Entries recovered by point lookups across all repositories.
    pub fn resolved(&self) -> usize {
        self.repositories
            .iter()
            .filter_map(|r| r.resolve.as_ref())
            .map(|s| s.resolved)
            .sum()
    }
}

/// Errors that end a download run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no access token configured")]
    MissingToken,

    #[error("no repositories given")]
    NoRepositories,

    #[error("output directory {} is not usable: {reason}", path.display())]
    OutputDirectory { path: PathBuf, reason: String },

    #[error("{repository}: {source}")]
    Platform {
        repository: String,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::platform::BulkItem;

    fn item(number: u64) -> BulkItem {
        BulkItem {
            number,
            author: None,
            title: String::new(),
            body: None,
            created_at: Utc::now(),
            files: Vec::new(),
            files_truncated: false,
        }
    }

    #[test]
    fn test_download_options_default() {
        let options = DownloadOptions::default();
        assert_eq!(options.page_size, 100);
        assert_eq!(options.retry.max_retries, 5);
        assert_eq!(options.rate_limit_buffer, Duration::from_secs(60));
        assert_eq!(options.progress_every, 100);
        assert!(!options.shutdown_requested());
    }

    #[test]
    fn test_shutdown_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let options = DownloadOptions {
            shutdown: Some(Arc::clone(&flag)),
            ..Default::default()
        };
        assert!(!options.shutdown_requested());
        flag.store(true, Ordering::Relaxed);
        assert!(options.shutdown_requested());
    }

    #[test]
    fn test_label_fetch_counts_distinct_numbers() {
        let fetch = LabelFetch {
            items: vec![item(10), item(11), item(10), item(12)],
            total_count: 5,
            complete: true,
        };
        assert_eq!(fetch.retrieved(), 3);
    }

    #[test]
    fn test_report_totals() {
        let report = DownloadReport {
            repositories: vec![
                RepositoryReport {
                    missing_issues: 2,
                    missing_pull_requests: 1,
                    resolve: Some(ResolveStats {
                        resolved: 3,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                RepositoryReport {
                    missing_issues: 1,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(report.missing_issues(), 3);
        assert_eq!(report.missing_pull_requests(), 1);
        assert_eq!(report.resolved(), 3);
    }
}
