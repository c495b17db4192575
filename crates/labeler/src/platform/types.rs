use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::label::{FilterError, LabelColor};
use crate::repository::RepositoryRef;

use super::errors::{PlatformError, Result, short_error_message};

/// Rate limit information from a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

/// The two kinds of labeled items a repository holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    /// Both kinds, in download order.
    pub const ALL: [ItemKind; 2] = [ItemKind::Issue, ItemKind::PullRequest];

    #[inline]
    pub fn is_pull_request(self) -> bool {
        matches!(self, Self::PullRequest)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue => f.write_str("issues"),
            Self::PullRequest => f.write_str("pull requests"),
        }
    }
}

/// A repository label with its authoritative item totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSummary {
    pub name: String,
    pub color: String,
    /// Issues carrying this label, as reported by the platform.
    pub issue_count: u64,
    /// Pull requests carrying this label, as reported by the platform.
    pub pull_request_count: u64,
}

impl LabelSummary {
    /// Expected total for one item kind.
    #[inline]
    pub fn count(&self, kind: ItemKind) -> u64 {
        match kind {
            ItemKind::Issue => self.issue_count,
            ItemKind::PullRequest => self.pull_request_count,
        }
    }
}

/// A label attached to a single issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLabel {
    pub name: String,
    pub color: String,
}

impl LabelColor for ItemLabel {
    fn color(&self) -> std::result::Result<&str, FilterError> {
        Ok(&self.color)
    }
}

/// One item from a label-filtered bulk page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    pub number: u64,
    /// Author login; `None` when the account was deleted.
    pub author: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Changed file paths (pull requests only).
    pub files: Vec<String>,
    /// The page held only the first slice of the changed files.
    pub files_truncated: bool,
}

/// One page of a cursor-paginated, label-filtered item listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPage {
    pub items: Vec<BulkItem>,
    pub has_next_page: bool,
    /// Opaque cursor for the next request.
    pub end_cursor: Option<String>,
    /// Total items carrying the label, as reported alongside the page.
    pub total_count: u64,
}

impl ItemPage {
    /// The cursor to request next, if pagination should continue.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// A lightweight entry from the full issue listing of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub number: u64,
    pub html_url: String,
    pub labels: Vec<ItemLabel>,
}

/// A single issue or pull request fetched by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetail {
    pub number: u64,
    pub author: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_pull_request: bool,
    pub labels: Vec<ItemLabel>,
}

/// Outcome of a point lookup.
///
/// The resolver branches on this value instead of on error types, so every
/// condition it must treat differently has its own variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    RateLimited { reset_at: DateTime<Utc> },
    TransientError(String),
}

impl<T> Lookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
            Self::RateLimited { reset_at } => Lookup::RateLimited { reset_at },
            Self::TransientError(message) => Lookup::TransientError(message),
        }
    }
}

impl<T> From<Result<T>> for Lookup<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(PlatformError::NotFound { .. }) => Self::NotFound,
            Err(PlatformError::RateLimited { reset_at }) => Self::RateLimited { reset_at },
            Err(e) => Self::TransientError(short_error_message(&e)),
        }
    }
}

/// The remote API surface the download pipeline consumes.
///
/// # Implementation Notes
///
/// Implementors should:
/// - Return `Ok(None)` from [`items_page`](Self::items_page) when the
///   platform answered with no page at all; callers retry that case
/// - Report not-found and rate-limit conditions on point lookups through
///   [`Lookup`] rather than as errors
/// - Convert platform-specific errors to `PlatformError`
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Get current rate limit status.
    async fn get_rate_limit(&self) -> Result<RateLimitInfo>;

    /// Every label of a repository with its issue and pull request totals.
    async fn label_counts(&self, repo: &RepositoryRef) -> Result<Vec<LabelSummary>>;

    /// One page of items of `kind` carrying `label`, starting after `after`.
    async fn items_page(
        &self,
        repo: &RepositoryRef,
        label: &str,
        kind: ItemKind,
        page_size: u32,
        after: Option<&str>,
    ) -> Result<Option<ItemPage>>;

    /// Every issue and pull request of a repository, in any state, with labels.
    async fn list_issues(&self, repo: &RepositoryRef) -> Result<Vec<IssueSummary>>;

    /// Fetch one issue or pull request by number.
    async fn fetch_item(&self, repo: &RepositoryRef, number: u64) -> Lookup<IssueDetail>;

    /// Changed file paths of one pull request.
    async fn pull_request_files(&self, repo: &RepositoryRef, number: u64) -> Lookup<Vec<String>>;
}
