//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

// Re-export the shared short_error_message function from platform module
pub use crate::platform::short_error_message;

/// How a failed REST call should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    NotFound,
    RateLimited,
    Auth,
    Other,
}

/// Classify an HTTP status and error message from GitHub.
///
/// 403 only counts as rate limiting when the message says so; otherwise it is
/// a permissions problem. 410 is returned for deleted issues.
pub(crate) fn classify_status(status: u16, message: &str) -> Failure {
    match status {
        404 | 410 => Failure::NotFound,
        429 => Failure::RateLimited,
        403 if message.to_ascii_lowercase().contains("rate limit") => Failure::RateLimited,
        401 | 403 => Failure::Auth,
        _ => Failure::Other,
    }
}

/// Classify an octocrab error.
pub(crate) fn classify(e: &octocrab::Error) -> Failure {
    match e {
        octocrab::Error::GitHub { source, .. } => {
            classify_status(source.status_code.as_u16(), &source.message)
        }
        _ => Failure::Other,
    }
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::NotFound(resource) => PlatformError::not_found(resource),
            GitHubError::Decode(msg) => PlatformError::decode(msg),
            GitHubError::GraphQl(msg) => PlatformError::api(msg),
            GitHubError::Api(e) => match classify(&e) {
                Failure::NotFound => PlatformError::not_found(e.to_string()),
                Failure::Auth => PlatformError::AuthRequired,
                _ if matches!(e, octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. }) => {
                    PlatformError::network(e.to_string())
                }
                _ => PlatformError::api(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(404, "Not Found"), Failure::NotFound);
        assert_eq!(classify_status(410, "This issue was deleted"), Failure::NotFound);
        assert_eq!(classify_status(429, ""), Failure::RateLimited);
        assert_eq!(
            classify_status(403, "API rate limit exceeded for user ID 1."),
            Failure::RateLimited
        );
        assert_eq!(
            classify_status(403, "You have exceeded a secondary rate limit"),
            Failure::RateLimited
        );
        assert_eq!(
            classify_status(403, "Resource not accessible by integration"),
            Failure::Auth
        );
        assert_eq!(classify_status(401, "Bad credentials"), Failure::Auth);
        assert_eq!(classify_status(502, "Bad Gateway"), Failure::Other);
    }

    #[test]
    fn test_github_error_to_platform_error() {
        let platform_err: PlatformError = GitHubError::RateLimited {
            reset_at: Utc::now(),
        }
        .into();
        assert!(matches!(platform_err, PlatformError::RateLimited { .. }));

        let platform_err: PlatformError = GitHubError::NotFound("octo/widgets".into()).into();
        assert!(matches!(platform_err, PlatformError::NotFound { .. }));

        let platform_err: PlatformError = GitHubError::Decode("missing field".into()).into();
        assert!(matches!(platform_err, PlatformError::Decode { .. }));

        let platform_err: PlatformError = GitHubError::GraphQl("boom".into()).into();
        assert!(matches!(platform_err, PlatformError::Api { .. }));
    }
}
