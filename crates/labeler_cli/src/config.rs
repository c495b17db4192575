//! Configuration file support for labeler.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `LABELER_`, e.g., `LABELER_GITHUB_TOKEN`)
//! 3. Config file (./labeler.toml, then ~/.config/labeler/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use LABELER_GITHUB_TOKEN env var
//! requests_per_second = 10
//!
//! [labels]
//! service_color = "e99695"
//! category_color = "ffeb77"
//! match = "any"  # or "all"
//!
//! [download]
//! page_size = 100
//! empty_retries = 5
//! empty_retry_delay_secs = 5
//! rate_limit_buffer_secs = 60
//! progress_every = 100
//! ```
//!
//! Environment variables split on `_`, so only single-word keys
//! (`LABELER_GITHUB_TOKEN`, `LABELER_LABELS_MATCH`) can be set that way.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use labeler::download::{
    DEFAULT_EMPTY_RETRIES, DEFAULT_EMPTY_RETRY_DELAY_SECS, DEFAULT_PAGE_SIZE,
    DEFAULT_PROGRESS_EVERY, DEFAULT_RATE_LIMIT_BUFFER_SECS, DownloadOptions,
};
use labeler::label::{CATEGORY_COLOR, SERVICE_COLOR};
use labeler::retry::RetryConfig;
use labeler::{InterestFilter, LabelType, MatchMode, rate_limits};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Interest filter configuration.
    pub labels: LabelsConfig,
    /// Default download options.
    pub download: DownloadConfig,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via LABELER_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// Proactive request pacing.
    pub requests_per_second: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            requests_per_second: rate_limits::GITHUB_DEFAULT_RPS,
        }
    }
}

/// Label colors that mark a label as interesting.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub service_color: String,
    pub category_color: String,
    #[serde(rename = "match")]
    pub match_mode: MatchMode,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            service_color: SERVICE_COLOR.to_string(),
            category_color: CATEGORY_COLOR.to_string(),
            match_mode: MatchMode::default(),
        }
    }
}

impl LabelsConfig {
    /// Build the interest filter, with an optional mode override.
    pub fn filter(&self, mode: Option<MatchMode>) -> InterestFilter {
        InterestFilter::new(
            vec![
                LabelType::new("Service", self.service_color.as_str()),
                LabelType::new("Category", self.category_color.as_str()),
            ],
            mode.unwrap_or(self.match_mode),
        )
    }
}

/// Default download options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Items per GraphQL page.
    pub page_size: u32,
    /// Retries after an empty page before giving up on a label.
    pub empty_retries: usize,
    pub empty_retry_delay_secs: u64,
    /// Extra wait after a rate limit reset.
    pub rate_limit_buffer_secs: u64,
    /// Resolver progress is logged every this many candidates.
    pub progress_every: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            empty_retries: DEFAULT_EMPTY_RETRIES,
            empty_retry_delay_secs: DEFAULT_EMPTY_RETRY_DELAY_SECS,
            rate_limit_buffer_secs: DEFAULT_RATE_LIMIT_BUFFER_SECS,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/labeler/config.toml)
    /// 3. Local config file (./labeler.toml)
    /// 4. Environment variables with LABELER_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("labeler.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./labeler.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., LABELER_GITHUB_TOKEN -> github.token
        builder = builder.add_source(
            Environment::with_prefix("LABELER")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the GitHub token.
    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().filter(|t| !t.trim().is_empty())
    }

    /// Download options from the `[download]` and `[labels]` sections.
    pub fn download_options(&self, mode: Option<MatchMode>) -> DownloadOptions {
        let download = &self.download;
        DownloadOptions {
            filter: self.labels.filter(mode),
            page_size: download.page_size.max(1),
            retry: RetryConfig::new(
                Duration::from_secs(download.empty_retry_delay_secs),
                download.empty_retries,
            ),
            rate_limit_buffer: Duration::from_secs(download.rate_limit_buffer_secs),
            progress_every: download.progress_every.max(1),
            shutdown: None,
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "labeler").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.requests_per_second, 10);
        assert_eq!(config.labels.service_color, "e99695");
        assert_eq!(config.labels.category_color, "ffeb77");
        assert_eq!(config.labels.match_mode, MatchMode::Any);
        assert_eq!(config.download.page_size, 100);
        assert_eq!(config.download.empty_retries, 5);
        assert_eq!(config.download.empty_retry_delay_secs, 5);
        assert_eq!(config.download.rate_limit_buffer_secs, 60);
        assert_eq!(config.download.progress_every, 100);
    }

    #[test]
    fn test_config_builder_with_defaults() {
        let settings = ConfigBuilder::builder().build().unwrap();
        let config: Config = settings.try_deserialize().unwrap_or_default();
        assert_eq!(config.download.page_size, 100);
        assert_eq!(config.labels.match_mode, MatchMode::Any);
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r##"
            [github]
            token = "ghp_test123"
            requests_per_second = 4

            [labels]
            service_color = "#123456"
            match = "all"

            [download]
            page_size = 50
            empty_retries = 2
            "##,
        );

        assert_eq!(config.github_token(), Some("ghp_test123".to_string()));
        assert_eq!(config.github.requests_per_second, 4);
        assert_eq!(config.labels.match_mode, MatchMode::All);
        // Unset keys keep their defaults.
        assert_eq!(config.labels.category_color, "ffeb77");
        assert_eq!(config.download.page_size, 50);
        assert_eq!(config.download.empty_retries, 2);
        assert_eq!(config.download.empty_retry_delay_secs, 5);
    }

    #[test]
    fn test_blank_token_is_missing() {
        let config = from_toml(
            r#"
            [github]
            token = "   "
            "#,
        );
        assert!(config.github_token().is_none());
    }

    #[test]
    fn test_download_options_from_config() {
        let config = from_toml(
            r##"
            [labels]
            service_color = "#abcdef"

            [download]
            empty_retries = 1
            empty_retry_delay_secs = 2
            rate_limit_buffer_secs = 30
            progress_every = 0
            "##,
        );

        let options = config.download_options(None);
        assert_eq!(options.retry.max_retries, 1);
        assert_eq!(options.retry.delay, Duration::from_secs(2));
        assert_eq!(options.rate_limit_buffer, Duration::from_secs(30));
        assert_eq!(options.progress_every, 1);
        assert_eq!(options.filter.mode(), MatchMode::Any);
        assert_eq!(options.filter.types()[0].color(), "abcdef");
        assert!(options.shutdown.is_none());
    }

    #[test]
    fn test_match_flag_overrides_config() {
        let config = Config::default();
        let options = config.download_options(Some(MatchMode::All));
        assert_eq!(options.filter.mode(), MatchMode::All);
    }
}
