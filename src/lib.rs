//! Browser-driven scraper for a retail clearance catalog.
//!
//! Pipeline: [`CrawlSession`] drives a Chromium page through the listing
//! (interstitial dismissal, load-more expansion or next-page pagination,
//! bounded by a page budget), extracts product records from each DOM
//! snapshot, downloads product images under bounded concurrency, and writes
//! the result as JSON and CSV.
//!
//! ```no_run
//! use clearance_scraper::{ScrapeConfig, scrape};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScrapeConfig::builder()
//!     .start_url("https://www.canadiantire.ca/en/promotions/clearance.html")
//!     .page_budget(5)
//!     .output_dir("./output")
//!     .build()?;
//! let records = scrape(config).await?;
//! println!("{} products", records.len());
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod browser_setup;
pub mod config;
pub mod error;
pub mod extract;
pub mod navigation;
pub mod output;
pub mod record;
pub mod session;

pub use config::{ScrapeConfig, ScrapeConfigBuilder};
pub use error::{ScrapeError, ScrapeResult};
pub use extract::extract_products;
pub use extract::price::parse_price;
pub use navigation::{NavigationController, PageAction, decide_action};
pub use record::{EnrichedProductRecord, RawProductRecord};
pub use session::CrawlSession;

/// Run one full scrape session with the given configuration.
///
/// # Errors
///
/// See [`CrawlSession::run`].
pub async fn scrape(config: ScrapeConfig) -> ScrapeResult<Vec<EnrichedProductRecord>> {
    CrawlSession::new(config).run().await
}
