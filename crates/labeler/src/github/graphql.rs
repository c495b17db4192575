//! GraphQL queries for label totals and label-filtered items.
//!
//! Responses are fetched as raw JSON and decoded here so the shape handling
//! can be tested without a network.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::error::GitHubError;
use crate::platform::{BulkItem, ItemKind, ItemPage, LabelSummary};
use crate::repository::RepositoryRef;

/// Page size for the label listing.
pub(crate) const LABELS_PAGE_SIZE: u32 = 100;

/// File paths fetched inline with each pull request.
pub(crate) const INLINE_FILES: u32 = 100;

const LABELS_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    labels(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        color
        issues { totalCount }
        pullRequests { totalCount }
      }
    }
  }
}
"#;

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $label: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    items: issues(first: $first, after: $after, labels: [$label]) {
      totalCount
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        author { login }
        title
        body
        createdAt
      }
    }
  }
}
"#;

const PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $label: String!, $first: Int!, $after: String, $files: Int!) {
  repository(owner: $owner, name: $name) {
    items: pullRequests(first: $first, after: $after, labels: [$label]) {
      totalCount
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        author { login }
        title
        body
        createdAt
        files(first: $files) {
          totalCount
          nodes { path }
        }
      }
    }
  }
}
"#;

/// Request body for one page of the label listing.
pub(crate) fn labels_request(repo: &RepositoryRef, after: Option<&str>) -> Value {
    json!({
        "query": LABELS_QUERY,
        "variables": {
            "owner": repo.owner(),
            "name": repo.name(),
            "first": LABELS_PAGE_SIZE,
            "after": after,
        }
    })
}

/// Request body for one page of items carrying `label`.
pub(crate) fn items_request(
    repo: &RepositoryRef,
    label: &str,
    kind: ItemKind,
    page_size: u32,
    after: Option<&str>,
) -> Value {
    match kind {
        ItemKind::Issue => json!({
            "query": ISSUES_QUERY,
            "variables": {
                "owner": repo.owner(),
                "name": repo.name(),
                "label": label,
                "first": page_size,
                "after": after,
            }
        }),
        ItemKind::PullRequest => json!({
            "query": PULL_REQUESTS_QUERY,
            "variables": {
                "owner": repo.owner(),
                "name": repo.name(),
                "label": label,
                "first": page_size,
                "after": after,
                "files": INLINE_FILES,
            }
        }),
    }
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    data: Option<RepositoryData<T>>,
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "N: Deserialize<'de>"))]
struct Connection<N> {
    #[serde(default)]
    total_count: u64,
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<N>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct LabelsRepository {
    labels: Option<Connection<LabelNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelNode {
    name: String,
    color: String,
    issues: TotalCount,
    pull_requests: TotalCount,
}

#[derive(Debug, Deserialize)]
struct ItemsRepository {
    items: Option<Connection<ItemNode>>,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct FileNode {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConnection {
    total_count: u64,
    #[serde(default)]
    nodes: Vec<Option<FileNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    number: u64,
    author: Option<Actor>,
    title: String,
    body: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    files: Option<FileConnection>,
}

impl From<ItemNode> for BulkItem {
    fn from(node: ItemNode) -> Self {
        let (files, files_truncated) = match node.files {
            Some(conn) => {
                let paths: Vec<String> = conn.nodes.into_iter().flatten().map(|f| f.path).collect();
                let truncated = conn.total_count > paths.len() as u64;
                (paths, truncated)
            }
            None => (Vec::new(), false),
        };
        BulkItem {
            number: node.number,
            author: node.author.map(|a| a.login),
            title: node.title,
            body: node.body,
            created_at: node.created_at,
            files,
            files_truncated,
        }
    }
}

/// A page of the label listing.
#[derive(Debug, Default)]
pub(crate) struct LabelsPage {
    pub labels: Vec<LabelSummary>,
    pub end_cursor: Option<String>,
}

/// Error classes GitHub reports inside an otherwise successful response.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ResponseFailure {
    RateLimited,
    NotFound(String),
    Other(String),
}

fn parse<T: DeserializeOwned>(
    response: Value,
) -> Result<(Option<T>, Option<ResponseFailure>), GitHubError> {
    let response: Response<T> =
        serde_json::from_value(response).map_err(|e| GitHubError::Decode(e.to_string()))?;

    let failure = response.errors.into_iter().next().map(|e| match e.kind.as_deref() {
        Some("RATE_LIMITED") => ResponseFailure::RateLimited,
        Some("NOT_FOUND") => ResponseFailure::NotFound(e.message),
        _ => ResponseFailure::Other(e.message),
    });
    let repository = response.data.and_then(|d| d.repository);
    Ok((repository, failure))
}

/// Decode one page of the label listing.
///
/// A missing repository is an error here since nothing else can proceed.
pub(crate) fn decode_labels(
    response: Value,
) -> Result<Result<LabelsPage, ResponseFailure>, GitHubError> {
    let (repository, failure) = parse::<LabelsRepository>(response)?;
    let Some(conn) = repository.and_then(|r| r.labels) else {
        return Ok(Err(failure.unwrap_or_else(|| {
            ResponseFailure::NotFound("repository".to_string())
        })));
    };

    let end_cursor = conn
        .page_info
        .has_next_page
        .then_some(conn.page_info.end_cursor)
        .flatten();
    let labels = conn
        .nodes
        .into_iter()
        .flatten()
        .map(|node| LabelSummary {
            name: node.name,
            color: node.color,
            issue_count: node.issues.total_count,
            pull_request_count: node.pull_requests.total_count,
        })
        .collect();

    Ok(Ok(LabelsPage { labels, end_cursor }))
}

/// Decode one page of label-filtered items.
///
/// Returns `Ok(Ok(None))` when the response carries no connection, which the
/// caller treats as an empty page.
pub(crate) fn decode_items(
    response: Value,
) -> Result<Result<Option<ItemPage>, ResponseFailure>, GitHubError> {
    let (repository, failure) = parse::<ItemsRepository>(response)?;
    match (repository.and_then(|r| r.items), failure) {
        (Some(conn), _) => Ok(Ok(Some(ItemPage {
            items: conn.nodes.into_iter().flatten().map(BulkItem::from).collect(),
            has_next_page: conn.page_info.has_next_page,
            end_cursor: conn.page_info.end_cursor,
            total_count: conn.total_count,
        }))),
        (None, Some(ResponseFailure::RateLimited)) => Ok(Err(ResponseFailure::RateLimited)),
        (None, Some(failure)) => {
            tracing::debug!(?failure, "Items query returned no data");
            Ok(Ok(None))
        }
        (None, None) => Ok(Ok(None)),
    }
}
