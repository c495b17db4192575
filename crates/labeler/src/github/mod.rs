//! GitHub implementation of [`PlatformClient`](crate::platform::PlatformClient).
//!
//! # Module Structure
//!
//! - [`error`] - Error types and status classification
//! - [`types`] - Rate limit payloads
//! - [`graphql`] - Label totals and label-filtered item pages
//! - [`convert`] - REST model conversion to platform types
//! - [`client`] - `GitHubClient`
//!
//! # Example
//!
//! ```ignore
//! use labeler::github::GitHubClient;
//! use labeler::download::{DownloadOptions, PipelineController};
//!
//! let client = GitHubClient::new(&token)?;
//! let controller = PipelineController::new(&client, DownloadOptions::default(), output);
//! let report = controller.run(&repos, &mut corpus, None).await?;
//! ```

mod client;
mod convert;
mod error;
mod graphql;
mod types;

// Re-export error types
pub use error::GitHubError;

// Re-export types
pub use types::{GitHubRateLimitResponse, GitHubRateLimits, RateLimitResource};

// Re-export client types and functions
pub use client::{GitHubClient, create_client, get_rate_limit, get_rate_limits};

// Re-export model conversion
pub use convert::{to_issue_detail, to_issue_summary};
