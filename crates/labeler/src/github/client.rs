//! GitHub API client creation and rate limit management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use octocrab::params;
use serde_json::Value;

use super::convert::{to_issue_detail, to_issue_summary};
use super::error::{Failure, GitHubError, classify};
use super::graphql::{self, ResponseFailure};
use super::types::GitHubRateLimitResponse;
use crate::platform::{
    self, IssueDetail, IssueSummary, ItemKind, ItemPage, LabelSummary, Lookup, PlatformClient,
    PlatformError, RateLimitInfo,
};
use crate::repository::RepositoryRef;

/// Create an authenticated Octocrab instance from a GitHub token.
pub fn create_client(token: &str) -> Result<Octocrab, GitHubError> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(GitHubError::Api)
}

fn reset_time(reset: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(reset as i64, 0).unwrap_or_else(Utc::now)
}

/// Get current rate limit status (core API only).
pub async fn get_rate_limit(client: &Octocrab) -> Result<RateLimitInfo, GitHubError> {
    let rate_limit = client.ratelimit().get().await?;
    let core = &rate_limit.resources.core;

    Ok(RateLimitInfo {
        limit: core.limit,
        remaining: core.remaining,
        reset_at: reset_time(core.reset),
    })
}

/// Get full rate limit status for all resources.
pub async fn get_rate_limits(client: &Octocrab) -> Result<GitHubRateLimitResponse, GitHubError> {
    // Fetch raw JSON to get all fields including those octocrab may not expose
    let response: GitHubRateLimitResponse = client
        .get("/rate_limit", None::<&()>)
        .await
        .map_err(GitHubError::Api)?;
    Ok(response)
}

/// GitHub API client implementing the PlatformClient trait.
///
/// Label totals and label-filtered pages go through GraphQL; the issue
/// listing and point lookups use REST.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
}

impl GitHubClient {
    /// Create a new GitHub client from an authentication token.
    pub fn new(token: &str) -> Result<Self, GitHubError> {
        Ok(Self::from_octocrab(create_client(token)?))
    }

    /// Create a GitHub client from an existing Octocrab instance.
    pub fn from_octocrab(client: Octocrab) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }

    /// Full rate limit breakdown, for display.
    pub async fn rate_limits(&self) -> Result<GitHubRateLimitResponse, GitHubError> {
        get_rate_limits(&self.inner).await
    }

    /// When the exhausted budget resets.
    ///
    /// Secondary limits leave the primary budget intact, in which case the
    /// reset is treated as now and the caller's buffer alone applies.
    async fn rate_limit_reset(&self, graphql: bool) -> DateTime<Utc> {
        let Ok(limits) = self.inner.ratelimit().get().await else {
            return Utc::now();
        };
        let rate = if graphql {
            limits.resources.graphql.unwrap_or(limits.resources.core)
        } else {
            limits.resources.core
        };
        if rate.remaining == 0 {
            reset_time(rate.reset)
        } else {
            Utc::now()
        }
    }

    /// Turn an octocrab error into a platform error, resolving rate limit
    /// resets along the way.
    async fn platform_error(&self, e: octocrab::Error, graphql: bool) -> PlatformError {
        match classify(&e) {
            Failure::RateLimited => GitHubError::RateLimited {
                reset_at: self.rate_limit_reset(graphql).await,
            }
            .into(),
            _ => GitHubError::Api(e).into(),
        }
    }

    async fn run_graphql(&self, body: &Value) -> platform::Result<Value> {
        match self.inner.graphql::<Value>(body).await {
            Ok(response) => Ok(response),
            Err(e) => Err(self.platform_error(e, true).await),
        }
    }

    /// Map an in-body GraphQL failure to a platform error.
    async fn response_failure(&self, repo: &RepositoryRef, failure: ResponseFailure) -> PlatformError {
        match failure {
            ResponseFailure::RateLimited => GitHubError::RateLimited {
                reset_at: self.rate_limit_reset(true).await,
            }
            .into(),
            ResponseFailure::NotFound(message) => {
                tracing::debug!(repo = %repo, message, "Repository not found");
                GitHubError::NotFound(repo.to_string()).into()
            }
            ResponseFailure::Other(message) => GitHubError::GraphQl(message).into(),
        }
    }

    async fn lookup_error<T>(&self, e: octocrab::Error) -> Lookup<T> {
        match classify(&e) {
            Failure::NotFound => Lookup::NotFound,
            _ => Lookup::from(Err(self.platform_error(e, false).await)),
        }
    }
}

#[async_trait]
impl PlatformClient for GitHubClient {
    async fn get_rate_limit(&self) -> platform::Result<RateLimitInfo> {
        get_rate_limit(&self.inner)
            .await
            .map_err(PlatformError::from)
    }

    #[tracing::instrument(skip_all, fields(repo = %repo))]
    async fn label_counts(&self, repo: &RepositoryRef) -> platform::Result<Vec<LabelSummary>> {
        let mut labels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let response = self
                .run_graphql(&graphql::labels_request(repo, cursor.as_deref()))
                .await?;
            let page = match graphql::decode_labels(response).map_err(PlatformError::from)? {
                Ok(page) => page,
                Err(failure) => return Err(self.response_failure(repo, failure).await),
            };

            labels.extend(page.labels);
            match page.end_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = labels.len(), "Fetched labels");
        Ok(labels)
    }

    async fn items_page(
        &self,
        repo: &RepositoryRef,
        label: &str,
        kind: ItemKind,
        page_size: u32,
        after: Option<&str>,
    ) -> platform::Result<Option<ItemPage>> {
        let body = graphql::items_request(repo, label, kind, page_size, after);
        let response = self.run_graphql(&body).await?;
        match graphql::decode_items(response).map_err(PlatformError::from)? {
            Ok(page) => Ok(page),
            Err(failure) => Err(self.response_failure(repo, failure).await),
        }
    }

    #[tracing::instrument(skip_all, fields(repo = %repo))]
    async fn list_issues(&self, repo: &RepositoryRef) -> platform::Result<Vec<IssueSummary>> {
        let first = match self
            .inner
            .issues(repo.owner(), repo.name())
            .list()
            .state(params::State::All)
            .per_page(100)
            .send()
            .await
        {
            Ok(page) => page,
            Err(e) => return Err(self.platform_error(e, false).await),
        };

        let issues = match self.inner.all_pages(first).await {
            Ok(issues) => issues,
            Err(e) => return Err(self.platform_error(e, false).await),
        };

        tracing::debug!(count = issues.len(), "Listed issues and pull requests");
        Ok(issues.iter().map(to_issue_summary).collect())
    }

    async fn fetch_item(&self, repo: &RepositoryRef, number: u64) -> Lookup<IssueDetail> {
        match self.inner.issues(repo.owner(), repo.name()).get(number).await {
            Ok(issue) => Lookup::Found(to_issue_detail(issue)),
            Err(e) => self.lookup_error(e).await,
        }
    }

    async fn pull_request_files(&self, repo: &RepositoryRef, number: u64) -> Lookup<Vec<String>> {
        let first = match self
            .inner
            .pulls(repo.owner(), repo.name())
            .list_files(number)
            .await
        {
            Ok(page) => page,
            Err(e) => return self.lookup_error(e).await,
        };

        match self.inner.all_pages(first).await {
            Ok(entries) => Lookup::Found(entries.into_iter().map(|f| f.filename).collect()),
            Err(e) => self.lookup_error(e).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_client_platform() {
        fn assert_platform_client<T: PlatformClient>() {}
        assert_platform_client::<GitHubClient>();
    }

    #[test]
    fn test_reset_time() {
        assert_eq!(reset_time(1_700_000_000).timestamp(), 1_700_000_000);
    }
}
