//! Corpus download pipeline.
//!
//! # Module Structure
//!
//! - [`types`] - Options, reports, errors, defaults
//! - [`progress`] - Progress reporting: `DownloadProgress`, `ProgressCallback`, `emit()`
//! - [`paginate`] - Cursor pagination per label and item kind
//! - [`reconcile`] - Expected versus retrieved counts
//! - [`resolve`] - Point lookups for missed items
//! - [`engine`] - Orchestration: `download_repositories()`, `PipelineController`
//!
//! # Example
//!
//! ```ignore
//! use labeler::corpus::Corpus;
//! use labeler::download::{DownloadOptions, download_repositories};
//!
//! async fn run<C: PlatformClient>(client: &C, repos: &[RepositoryRef]) {
//!     let mut corpus = Corpus::new();
//!     let report = download_repositories(client, repos, &DownloadOptions::default(), &mut corpus, None).await?;
//!     println!("{} entries, {} missing issues", report.entries, report.missing_issues());
//! }
//! ```

pub mod engine;
pub mod paginate;
mod progress;
pub mod reconcile;
pub mod resolve;
mod types;

// Re-export types
pub use types::{
    DownloadOptions, DownloadReport, LabelFetch, PipelineError, RepositoryReport, ResolveStats,
};

// Re-export constants
pub use types::{
    DEFAULT_EMPTY_RETRIES, DEFAULT_EMPTY_RETRY_DELAY_SECS, DEFAULT_PAGE_SIZE,
    DEFAULT_PROGRESS_EVERY, DEFAULT_RATE_LIMIT_BUFFER_SECS,
};

// Re-export progress types
pub use progress::{DownloadProgress, ProgressCallback, emit};

// Re-export engine functions for convenience
pub use engine::{
    PipelineController, check_output, check_preconditions, download_repositories,
    fetch_repository, resolve_repository,
};
pub use paginate::fetch_by_label;
pub use reconcile::{Reconciliation, missing};
pub use resolve::resolve;
