//! GitHub rate limit payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Budget for one rate-limited resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResource {
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
    /// Unix timestamp when the budget resets.
    pub reset: u64,
}

impl RateLimitResource {
    /// Get the reset time as a DateTime.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset as i64, 0).unwrap_or_else(Utc::now)
    }

    /// Share of the budget already spent, in percent.
    pub fn usage_percent(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.used as f64 / self.limit as f64) * 100.0
    }
}

/// The resources a corpus download draws from.
///
/// Label totals and label pages are GraphQL; listing and point lookups are
/// REST (`core`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRateLimits {
    pub core: RateLimitResource,
    #[serde(default)]
    pub graphql: Option<RateLimitResource>,
    pub search: RateLimitResource,
}

impl GitHubRateLimits {
    /// Named resources in display order.
    pub fn named(&self) -> Vec<(&'static str, &RateLimitResource)> {
        let mut items = vec![("core", &self.core)];
        if let Some(graphql) = &self.graphql {
            items.push(("graphql", graphql));
        }
        items.push(("search", &self.search));
        items
    }
}

/// Full rate limit response from GitHub's API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRateLimitResponse {
    pub resources: GitHubRateLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(limit: usize, used: usize) -> RateLimitResource {
        RateLimitResource {
            limit,
            used,
            remaining: limit - used,
            reset: 2_000_000_000,
        }
    }

    #[test]
    fn test_reset_at() {
        assert_eq!(resource(5000, 100).reset_at().timestamp(), 2_000_000_000);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(resource(5000, 1250).usage_percent(), 25.0);
        assert_eq!(resource(0, 0).usage_percent(), 0.0);
    }

    #[test]
    fn test_rate_limit_response_without_graphql() {
        let json = r#"{
            "resources": {
                "core": { "limit": 5000, "used": 100, "remaining": 4900, "reset": 1700000000 },
                "search": { "limit": 30, "used": 5, "remaining": 25, "reset": 1700000000 },
                "code_search": { "limit": 10, "used": 0, "remaining": 10, "reset": 1700000000 }
            }
        }"#;

        let response: GitHubRateLimitResponse = serde_json::from_str(json).unwrap();
        assert!(response.resources.graphql.is_none());
        let names: Vec<_> = response.resources.named().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["core", "search"]);
    }

    #[test]
    fn test_named_includes_graphql() {
        let limits = GitHubRateLimits {
            core: resource(5000, 0),
            graphql: Some(resource(5000, 50)),
            search: resource(30, 0),
        };
        let named = limits.named();
        assert_eq!(named[1].0, "graphql");
        assert_eq!(named[1].1.used, 50);
    }
}
