//! Platform-agnostic trait for the remote issue tracker.
//!
//! This module defines the `PlatformClient` trait: the label counts query,
//! the label-filtered page query, the full issue listing, and the two point
//! lookups the download pipeline is built on. The GitHub implementation lives
//! in [`crate::github`]; tests drive the pipeline with scripted in-memory
//! clients.
//!
//! # Example
//!
//! ```ignore
//! use labeler::platform::{ItemKind, PlatformClient, PlatformError};
//! use labeler::repository::RepositoryRef;
//!
//! async fn first_page<C: PlatformClient>(client: &C) -> Result<(), PlatformError> {
//!     let repo = RepositoryRef::parse("octo/widgets").unwrap();
//!     if let Some(page) = client.items_page(&repo, "bug", ItemKind::Issue, 100, None).await? {
//!         println!("{} of {}", page.items.len(), page.total_count);
//!     }
//!     Ok(())
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, RateLimitedClient, rate_limits};
pub use types::{
    BulkItem, IssueDetail, IssueSummary, ItemKind, ItemLabel, ItemPage, LabelSummary, Lookup,
    PlatformClient, RateLimitInfo,
};
