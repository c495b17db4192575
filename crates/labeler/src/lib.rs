//! Labeler - builds a training corpus of labeled GitHub issues and pull requests.
//!
//! For each repository, every item carrying a label of interest is pulled in
//! bulk, label by label. The retrieved counts are reconciled against the
//! platform's own totals, and any shortfall is recovered with point lookups.
//! The result is a deduplicated, chronologically ordered tab-separated file.
//!
//! # Features
//!
//! - `github` (default) - Enables the octocrab-backed [`github::GitHubClient`].
//!   Without it, any [`PlatformClient`] implementation can drive the pipeline.
//!
//! # Example
//!
//! ```ignore
//! use labeler::{Corpus, RepositoryRef};
//! use labeler::download::{DownloadOptions, PipelineController};
//! use labeler::github::GitHubClient;
//!
//! let client = GitHubClient::new(&token)?;
//! let repos = vec![RepositoryRef::parse("octo/widgets")?];
//! let mut corpus = Corpus::new();
//! let controller = PipelineController::new(&client, DownloadOptions::default(), "widgets.tsv");
//! let report = controller.run(&repos, &mut corpus, None).await?;
//! println!("{} entries", report.entries);
//! ```

pub mod corpus;
pub mod download;
pub mod label;
pub mod platform;
pub mod repository;
pub mod retry;

#[cfg(feature = "github")]
pub mod github;

pub use corpus::{Corpus, CorpusError, CorpusLine, TrainingItem};
pub use label::{FilterError, InterestFilter, LabelColor, LabelType, MatchMode};
pub use platform::{
    ApiRateLimiter, Lookup, PlatformClient, PlatformError, RateLimitInfo, RateLimitedClient,
    rate_limits,
};
pub use repository::{RepositoryRef, RepositoryRefError};
