//! Scrape configuration and its fluent builder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ScrapeError, ScrapeResult};

/// Default navigation iteration ceiling
pub const DEFAULT_PAGE_BUDGET: usize = 20;
/// Default cap on concurrent image downloads
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 6;
/// Default per-image download timeout
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Configuration for one scrape session.
///
/// Construct via [`ScrapeConfig::builder`]; `start_url` is the only required
/// field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub(crate) start_url: String,
    pub(crate) page_budget: usize,
    pub(crate) headless: bool,
    pub(crate) output_dir: PathBuf,
    pub(crate) image_dir: PathBuf,
    pub(crate) max_concurrent_downloads: usize,
    pub(crate) download_timeout_secs: u64,
    /// Streamed download size cap; oversized payloads abort that item only
    pub(crate) max_image_size_bytes: usize,
    pub(crate) navigation_timeout_secs: u64,
    /// Bounded wait for the product list container; timing out is non-fatal
    pub(crate) list_wait_timeout_secs: u64,
}

impl ScrapeConfig {
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn page_budget(&self) -> usize {
        self.page_budget
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub fn image_dir(&self) -> &PathBuf {
        &self.image_dir
    }

    /// Path of the JSON output target
    #[must_use]
    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join("data.json")
    }

    /// Path of the CSV output target
    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join("data.csv")
    }

    #[must_use]
    pub fn max_concurrent_downloads(&self) -> usize {
        self.max_concurrent_downloads
    }

    #[must_use]
    pub fn download_timeout_secs(&self) -> u64 {
        self.download_timeout_secs
    }

    #[must_use]
    pub fn max_image_size_bytes(&self) -> usize {
        self.max_image_size_bytes
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn list_wait_timeout_secs(&self) -> u64 {
        self.list_wait_timeout_secs
    }
}

/// Fluent builder for [`ScrapeConfig`].
#[derive(Debug, Clone)]
pub struct ScrapeConfigBuilder {
    start_url: Option<String>,
    page_budget: usize,
    headless: bool,
    output_dir: PathBuf,
    image_dir: Option<PathBuf>,
    max_concurrent_downloads: usize,
    download_timeout_secs: u64,
    max_image_size_bytes: usize,
    navigation_timeout_secs: u64,
    list_wait_timeout_secs: u64,
}

impl Default for ScrapeConfigBuilder {
    fn default() -> Self {
        Self {
            start_url: None,
            page_budget: DEFAULT_PAGE_BUDGET,
            headless: true,
            output_dir: PathBuf::from("./output"),
            image_dir: None,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_image_size_bytes: 10 * 1024 * 1024,
            navigation_timeout_secs: 30,
            list_wait_timeout_secs: 10,
        }
    }
}

impl ScrapeConfigBuilder {
    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    pub fn page_budget(mut self, budget: usize) -> Self {
        self.page_budget = budget;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    pub fn max_concurrent_downloads(mut self, n: usize) -> Self {
        self.max_concurrent_downloads = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = secs;
        self
    }

    pub fn max_image_size_bytes(mut self, bytes: usize) -> Self {
        self.max_image_size_bytes = bytes;
        self
    }

    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    pub fn list_wait_timeout_secs(mut self, secs: u64) -> Self {
        self.list_wait_timeout_secs = secs;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if `start_url` is missing or not a
    /// valid http(s) URL, or if `page_budget` or `max_concurrent_downloads`
    /// is zero.
    pub fn build(self) -> ScrapeResult<ScrapeConfig> {
        let start_url = self
            .start_url
            .ok_or_else(|| ScrapeError::Config("start_url is required".into()))?;

        let parsed = url::Url::parse(&start_url)
            .map_err(|e| ScrapeError::Config(format!("invalid start_url '{start_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScrapeError::Config(format!(
                "start_url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if self.page_budget == 0 {
            return Err(ScrapeError::Config("page_budget must be at least 1".into()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ScrapeError::Config(
                "max_concurrent_downloads must be at least 1".into(),
            ));
        }

        let image_dir = self
            .image_dir
            .unwrap_or_else(|| self.output_dir.join("images"));

        Ok(ScrapeConfig {
            start_url,
            page_budget: self.page_budget,
            headless: self.headless,
            output_dir: self.output_dir,
            image_dir,
            max_concurrent_downloads: self.max_concurrent_downloads,
            download_timeout_secs: self.download_timeout_secs,
            max_image_size_bytes: self.max_image_size_bytes,
            navigation_timeout_secs: self.navigation_timeout_secs,
            list_wait_timeout_secs: self.list_wait_timeout_secs,
        })
    }
}
