use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::repository::RepositoryRef;

use super::errors::Result;
use super::types::{
    IssueDetail, IssueSummary, ItemKind, ItemPage, LabelSummary, Lookup, PlatformClient,
    RateLimitInfo,
};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default pacing (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour = ~1.4/sec, we use 10/sec to allow bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
}

/// A standalone API rate limiter using the governor crate.
///
/// # Example
///
/// ```ignore
/// use labeler::platform::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// client.fetch_item(&repo, 42).await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// Zero is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// A rate-limited wrapper around any `PlatformClient`.
///
/// Every remote call waits for the shared limiter before delegating, so a
/// whole download run stays within one request budget.
///
/// # Example
///
/// ```ignore
/// use labeler::platform::{RateLimitedClient, rate_limits};
/// use labeler::github::GitHubClient;
///
/// let client = GitHubClient::new(&token)?;
/// let client = RateLimitedClient::new(client, rate_limits::GITHUB_DEFAULT_RPS);
/// ```
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedClient<C> {
    /// Create a new rate-limited client wrapper.
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: PlatformClient> PlatformClient for RateLimitedClient<C> {
    async fn get_rate_limit(&self) -> Result<RateLimitInfo> {
        self.limiter.wait().await;
        self.inner.get_rate_limit().await
    }

    async fn label_counts(&self, repo: &RepositoryRef) -> Result<Vec<LabelSummary>> {
        self.limiter.wait().await;
        self.inner.label_counts(repo).await
    }

    async fn items_page(
        &self,
        repo: &RepositoryRef,
        label: &str,
        kind: ItemKind,
        page_size: u32,
        after: Option<&str>,
    ) -> Result<Option<ItemPage>> {
        self.limiter.wait().await;
        self.inner
            .items_page(repo, label, kind, page_size, after)
            .await
    }

    async fn list_issues(&self, repo: &RepositoryRef) -> Result<Vec<IssueSummary>> {
        self.limiter.wait().await;
        self.inner.list_issues(repo).await
    }

    async fn fetch_item(&self, repo: &RepositoryRef, number: u64) -> Lookup<IssueDetail> {
        self.limiter.wait().await;
        self.inner.fetch_item(repo, number).await
    }

    async fn pull_request_files(&self, repo: &RepositoryRef, number: u64) -> Lookup<Vec<String>> {
        self.limiter.wait().await;
        self.inner.pull_request_files(repo, number).await
    }
}
