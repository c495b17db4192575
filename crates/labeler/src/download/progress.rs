//! Progress reporting types for download runs.
//!
//! The pipeline emits these events through an optional callback so a front
//! end can render them; the pipeline itself also logs through `tracing`.

use crate::platform::ItemKind;

/// Progress events emitted during a download run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DownloadProgress {
    /// Starting a repository.
    RepositoryStarted {
        repository: String,
        /// 1-based position in the repository group.
        index: usize,
        total: usize,
    },

    /// Label totals received.
    LabelsFetched {
        repository: String,
        /// All labels in the repository.
        total: usize,
        /// Labels that passed the interest filter.
        of_interest: usize,
    },

    /// Starting to page through one label.
    FetchingLabel {
        repository: String,
        label: String,
        kind: ItemKind,
        /// Authoritative count for this label and kind.
        expected: u64,
    },

    /// Fetched a page of items.
    FetchedPage {
        repository: String,
        label: String,
        kind: ItemKind,
        /// Page number (1-indexed).
        page: u32,
        count: usize,
        total_so_far: usize,
    },

    /// A page came back empty and will be requested again.
    EmptyPageRetry {
        repository: String,
        label: String,
        kind: ItemKind,
        page: u32,
        retry_after_ms: u64,
        attempt: u32,
    },

    /// Pagination for one label stopped before the last page.
    PaginationStopped {
        repository: String,
        label: String,
        kind: ItemKind,
        retrieved: u64,
        expected: u64,
        reason: String,
    },

    /// Finished one label and kind.
    LabelComplete {
        repository: String,
        label: String,
        kind: ItemKind,
        retrieved: u64,
        expected: u64,
        missing: u64,
    },

    /// Starting point lookups for items the bulk path missed.
    ResolvingMissing {
        repository: String,
        missing_issues: u64,
        missing_pull_requests: u64,
        candidates: usize,
    },

    /// Periodic resolver progress.
    ResolveProgress {
        repository: String,
        processed: usize,
        total: usize,
    },

    /// Rate limited, waiting for the reset before retrying the same item.
    RateLimitBackoff {
        repository: String,
        number: u64,
        retry_after_ms: u64,
    },

    /// A candidate could not be recovered.
    ItemSkipped {
        repository: String,
        number: u64,
        reason: String,
    },

    /// Resolver finished.
    ResolveComplete {
        repository: String,
        resolved: usize,
        not_found: usize,
        failed: usize,
    },

    /// Finished a repository.
    RepositoryComplete {
        repository: String,
        entries: usize,
    },

    /// The run is stopping early on request.
    Interrupted,

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback for progress updates during a download run.
pub type ProgressCallback = Box<dyn Fn(DownloadProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// # Example
///
/// ```
/// use labeler::download::{DownloadProgress, ProgressCallback, emit};
///
/// fn step(on_progress: Option<&ProgressCallback>) {
///     emit(on_progress, DownloadProgress::Interrupted);
/// }
/// step(None);
/// ```
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: DownloadProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
