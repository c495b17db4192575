pub(crate) mod download;
pub(crate) mod labels;
pub(crate) mod limits;

use console::style;
use labeler::{PlatformClient, RepositoryRef};

use crate::config::Config;

/// The configured GitHub token, or an error naming where to set it.
pub(crate) fn require_token(config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    config.github_token().ok_or_else(|| {
        "No GitHub token configured. Set LABELER_GITHUB_TOKEN or [github] token in labeler.toml."
            .into()
    })
}

/// Parse `owner/name` arguments, rejecting the whole list on the first bad one.
pub(crate) fn parse_repositories(
    args: &[String],
) -> Result<Vec<RepositoryRef>, Box<dyn std::error::Error>> {
    args.iter()
        .map(|arg| {
            RepositoryRef::parse(arg).map_err(|e| format!("Invalid repository '{}': {}", arg, e).into())
        })
        .collect()
}

/// Print the current core rate limit budget.
pub(crate) async fn display_rate_limit<C: PlatformClient + ?Sized>(client: &C, is_tty: bool) {
    match client.get_rate_limit().await {
        Ok(rate_limit) => {
            if is_tty {
                println!(
                    "Rate limit: {}/{} remaining (resets at {})\n",
                    rate_limit.remaining, rate_limit.limit, rate_limit.reset_at
                );
            } else {
                tracing::info!(
                    remaining = rate_limit.remaining,
                    limit = rate_limit.limit,
                    "Rate limit status"
                );
            }
        }
        Err(e) => {
            if is_tty {
                println!(
                    "{} Could not fetch rate limit: {}\n",
                    style("⚠").yellow(),
                    e
                );
            } else {
                tracing::warn!(error = %e, "Could not fetch rate limit");
            }
        }
    }
}
