//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target site and categories
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Where artifacts are written
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.max_attempts == 0 {
            return Err(AppError::validation("crawler.max_attempts must be > 0"));
        }

        let base = Url::parse(&self.site.base_url)
            .map_err(|e| AppError::validation(format!("site.base_url is invalid: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation(
                "site.base_url must be an http(s) URL",
            ));
        }

        if self.site.categories.is_empty() {
            return Err(AppError::validation("No categories defined"));
        }
        let mut seen = HashSet::new();
        for category in &self.site.categories {
            if category.trim().is_empty() {
                return Err(AppError::validation("site.categories contains a blank entry"));
            }
            if !seen.insert(category.as_str()) {
                return Err(AppError::validation(format!(
                    "site.categories lists '{category}' twice"
                )));
            }
        }
        Ok(())
    }
}

/// The site being harvested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// URL prefix every category and post lives under
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Category identifiers, crawled independently
    #[serde(default = "defaults::categories")]
    pub categories: Vec<String>,

    /// Suffix a post URL must end with to be fetched
    #[serde(default = "defaults::post_suffix")]
    pub post_suffix: String,
}

impl SiteConfig {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            categories: defaults::categories(),
            post_suffix: defaults::post_suffix(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Attempts per request before the item is dropped
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in seconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_secs: u64,

    /// Log progress every N completed items
    #[serde(default = "defaults::progress_every")]
    pub progress_every: usize,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            max_attempts: defaults::max_attempts(),
            retry_delay_secs: defaults::retry_delay(),
            progress_every: defaults::progress_every(),
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the four JSON artifacts
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Directory attachments are downloaded into
    #[serde(default = "defaults::files_dir")]
    pub files_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            files_dir: defaults::files_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Site defaults
    pub fn base_url() -> String {
        "http://i.whut.edu.cn".into()
    }
    pub fn categories() -> Vec<String> {
        ["xxtg", "xytg", "bmxw", "lgjz"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn post_suffix() -> String {
        ".shtml".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        5
    }
    pub fn max_concurrent() -> usize {
        32
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        2
    }
    pub fn progress_every() -> usize {
        50
    }

    // Path defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn files_dir() -> PathBuf {
        PathBuf::from("data/file")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
