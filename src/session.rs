//! Session orchestration: browser lifecycle, navigation loop, download and
//! output stages.
//!
//! The navigation phase and the download phase never overlap: the browser is
//! torn down before the first image request is issued. A fatal error during
//! launch or initial navigation aborts the session without writing any
//! output; once at least one extraction pass has run, later per-item
//! failures only degrade their own records.

use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::assets;
use crate::browser_setup::launch_browser;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::extract_products;
use crate::navigation::{NavigationController, PageAction};
use crate::output;
use crate::record::{EnrichedProductRecord, RawProductRecord};

/// One full crawl of the clearance catalog.
pub struct CrawlSession {
    config: ScrapeConfig,
}

impl CrawlSession {
    #[must_use]
    pub fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }

    /// Run the session end to end: navigate, extract, download, persist.
    ///
    /// # Errors
    ///
    /// Fails fatally on browser launch or initial navigation failure (no
    /// output is written), and on output-target write failure (both targets
    /// are still attempted).
    pub async fn run(self) -> ScrapeResult<Vec<EnrichedProductRecord>> {
        let (browser, handler_task, user_data_dir) = launch_browser(self.config.headless())
            .await
            .map_err(|e| ScrapeError::Browser(format!("{e:#}")))?;

        let accumulated = match self.navigate_and_extract(&browser).await {
            Ok(records) => {
                teardown(browser, handler_task, user_data_dir).await;
                records
            }
            Err(e) => {
                teardown(browser, handler_task, user_data_dir).await;
                return Err(ScrapeError::Navigation(format!("{e:#}")));
            }
        };

        info!(total = accumulated.len(), "extraction complete");

        let client = reqwest::Client::builder()
            .user_agent("clearance-scraper/0.3")
            .build()
            .context("failed to build HTTP client")?;
        let enriched = assets::download_images(accumulated, &client, &self.config).await?;

        self.write_outputs(&enriched).await?;
        Ok(enriched)
    }

    /// Open a page, run the initial navigation, then hand off to the crawl
    /// loop over a live driver.
    async fn navigate_and_extract(&self, browser: &Browser) -> Result<Vec<RawProductRecord>> {
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;
        let nav = NavigationController::new(&page, &self.config);

        // Validated at config build time; re-parsed here as the fallback
        // base for resolving relative URLs.
        let start_url =
            Url::parse(self.config.start_url()).context("start URL is not parseable")?;

        // Initial navigation failure is fatal: nothing was extracted, so
        // there is nothing worth keeping.
        nav.load_initial(self.config.start_url()).await?;

        let mut driver = BrowserDriver {
            nav,
            page: &page,
            fallback: start_url,
        };
        crawl_pages(&mut driver, self.config.page_budget()).await
    }

    /// Attempt both output targets; one failing must not prevent the other.
    async fn write_outputs(&self, records: &[EnrichedProductRecord]) -> ScrapeResult<()> {
        let json_result = output::write_json(&self.config.json_path(), records).await;
        let csv_result = output::write_csv(&self.config.csv_path(), records).await;

        if let Err(e) = &json_result {
            warn!("JSON output failed: {e:#}");
        }
        if let Err(e) = &csv_result {
            warn!("CSV output failed: {e:#}");
        }

        match (json_result, csv_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(source), _) => Err(ScrapeError::Output {
                target: self.config.json_path().display().to_string(),
                source,
            }),
            (_, Err(source)) => Err(ScrapeError::Output {
                target: self.config.csv_path().display().to_string(),
                source,
            }),
        }
    }
}

/// Minimal page surface the crawl loop needs. The loop's accumulation and
/// budget logic is generic over this trait so it runs against a scripted
/// page sequence in tests, without a live browser.
trait PageDriver {
    async fn wait_ready(&mut self);
    async fn snapshot(&mut self) -> Result<String>;
    async fn base_url(&mut self) -> Url;
    async fn advance(&mut self) -> Result<PageAction>;
}

struct BrowserDriver<'a> {
    nav: NavigationController<'a>,
    page: &'a Page,
    fallback: Url,
}

impl PageDriver for BrowserDriver<'_> {
    async fn wait_ready(&mut self) {
        self.nav.wait_for_product_list().await;
    }

    async fn snapshot(&mut self) -> Result<String> {
        self.nav.snapshot().await
    }

    async fn base_url(&mut self) -> Url {
        current_base_url(self.page, &self.fallback).await
    }

    async fn advance(&mut self) -> Result<PageAction> {
        self.nav.advance().await
    }
}

/// The sequential extraction loop, bounded by the page budget.
///
/// Batches are appended in visit order and never deduplicated. Only a
/// snapshot failure on the very first page is an error; once any page has
/// been extracted, a later snapshot or pagination failure stops the loop and
/// the accumulated records are kept.
async fn crawl_pages<D: PageDriver>(
    driver: &mut D,
    page_budget: usize,
) -> Result<Vec<RawProductRecord>> {
    let mut accumulated: Vec<RawProductRecord> = Vec::new();
    let mut pages_visited = 0usize;

    loop {
        driver.wait_ready().await;

        let html = match driver.snapshot().await {
            Ok(html) => html,
            Err(e) => {
                if pages_visited == 0 {
                    return Err(e.context("failed to snapshot the first page"));
                }
                warn!(pages_visited, "snapshot failed, stopping navigation: {e:#}");
                break;
            }
        };
        let base_url = driver.base_url().await;
        let batch = extract_products(&html, &base_url);
        pages_visited += 1;
        info!(
            page = pages_visited,
            extracted = batch.len(),
            total = accumulated.len() + batch.len(),
            "extracted page batch"
        );
        accumulated.extend(batch);

        if pages_visited >= page_budget {
            info!(budget = page_budget, "page budget reached");
            break;
        }

        match driver.advance().await {
            Ok(PageAction::Done) => break,
            Ok(action) => debug!(?action, "continuing navigation"),
            Err(e) => {
                // A control that vanished mid-click is a flaky page, not
                // a reason to discard what we already have.
                warn!(error = %e, "pagination step failed, stopping navigation");
                break;
            }
        }
    }

    Ok(accumulated)
}

/// Base URL for resolving relative links: the page's current URL when it has
/// one (it changes under true pagination), otherwise the start URL.
async fn current_base_url(page: &Page, fallback: &Url) -> Url {
    if let Ok(Some(current)) = page.url().await
        && let Ok(parsed) = Url::parse(&current)
    {
        return parsed;
    }
    fallback.clone()
}

/// Close the browser, wait for the process, stop the handler task, and
/// remove the session's user data directory. Every step is best-effort.
async fn teardown(mut browser: Browser, handler_task: JoinHandle<()>, user_data_dir: PathBuf) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "failed to close browser");
    }
    if let Err(e) = browser.wait().await {
        warn!(error = %e, "failed to wait for browser exit");
    }
    handler_task.abort();
    if let Err(e) = std::fs::remove_dir_all(&user_data_dir) {
        debug!(error = %e, dir = %user_data_dir.display(), "failed to remove user data dir");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    const TWO_TILE_PAGE: &str = r#"
        <div class="product-tile">
          <h3 class="product-tile__title">Cordless Drill 20V</h3>
          <span class="price">99,99 $</span>
        </div>
        <div class="product-tile">
          <h3 class="product-tile__title">Tool Chest, 5-Drawer</h3>
          <span class="price">249,99 $</span>
        </div>
    "#;

    // Load-more patches the DOM in place, so the expanded snapshot contains
    // the original tiles again plus the new ones.
    const FOUR_TILE_PAGE: &str = r#"
        <div class="product-tile">
          <h3 class="product-tile__title">Cordless Drill 20V</h3>
          <span class="price">99,99 $</span>
        </div>
        <div class="product-tile">
          <h3 class="product-tile__title">Tool Chest, 5-Drawer</h3>
          <span class="price">249,99 $</span>
        </div>
        <div class="product-tile">
          <h3 class="product-tile__title">Shop Vacuum 12L</h3>
          <span class="price">79,99 $</span>
        </div>
        <div class="product-tile">
          <h3 class="product-tile__title">Work Light</h3>
          <span class="price">34,99 $</span>
        </div>
    "#;

    /// Replays a fixed snapshot/action script; once the script runs out it
    /// keeps serving the two-tile page and offering to expand, which models a
    /// listing whose controls never go away.
    struct ScriptedPage {
        snapshots: VecDeque<Result<String>>,
        actions: VecDeque<Result<PageAction>>,
        snapshots_taken: usize,
    }

    impl ScriptedPage {
        fn new(snapshots: Vec<Result<String>>, actions: Vec<Result<PageAction>>) -> Self {
            Self {
                snapshots: snapshots.into(),
                actions: actions.into(),
                snapshots_taken: 0,
            }
        }

        fn endless() -> Self {
            Self::new(Vec::new(), Vec::new())
        }
    }

    impl PageDriver for ScriptedPage {
        async fn wait_ready(&mut self) {}

        async fn snapshot(&mut self) -> Result<String> {
            self.snapshots_taken += 1;
            self.snapshots
                .pop_front()
                .unwrap_or_else(|| Ok(TWO_TILE_PAGE.to_string()))
        }

        async fn base_url(&mut self) -> Url {
            Url::parse("https://www.example.com/en/promotions/clearance.html").unwrap()
        }

        async fn advance(&mut self) -> Result<PageAction> {
            self.actions.pop_front().unwrap_or(Ok(PageAction::Expanded))
        }
    }

    #[tokio::test]
    async fn single_page_without_controls_takes_one_iteration() {
        let mut driver = ScriptedPage::new(
            vec![Ok(TWO_TILE_PAGE.to_string())],
            vec![Ok(PageAction::Done)],
        );
        let records = crawl_pages(&mut driver, 20).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(driver.snapshots_taken, 1);
        assert_eq!(records[0].title, "Cordless Drill 20V");
        assert_eq!(records[1].title, "Tool Chest, 5-Drawer");
    }

    #[tokio::test]
    async fn load_more_once_accumulates_both_passes() {
        let mut driver = ScriptedPage::new(
            vec![Ok(TWO_TILE_PAGE.to_string()), Ok(FOUR_TILE_PAGE.to_string())],
            vec![Ok(PageAction::Expanded), Ok(PageAction::Done)],
        );
        let records = crawl_pages(&mut driver, 20).await.unwrap();

        // Batches append without deduplication: 2 from the first pass plus
        // all 4 from the expanded DOM.
        assert_eq!(records.len(), 6);
        assert_eq!(driver.snapshots_taken, 2);
        assert_eq!(records[2].title, "Cordless Drill 20V");
        assert_eq!(records[5].title, "Work Light");
    }

    #[tokio::test]
    async fn budget_caps_perpetually_visible_controls() {
        let mut driver = ScriptedPage::endless();
        let records = crawl_pages(&mut driver, 3).await.unwrap();

        assert_eq!(driver.snapshots_taken, 3);
        assert_eq!(records.len(), 6);
    }

    #[tokio::test]
    async fn budget_of_one_extracts_exactly_one_page() {
        let mut driver = ScriptedPage::endless();
        let records = crawl_pages(&mut driver, 1).await.unwrap();

        assert_eq!(driver.snapshots_taken, 1);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_failure_keeps_already_extracted_records() {
        let mut driver = ScriptedPage::new(
            vec![Ok(TWO_TILE_PAGE.to_string()), Err(anyhow!("tab crashed"))],
            vec![Ok(PageAction::Paginated)],
        );
        let records = crawl_pages(&mut driver, 20).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(driver.snapshots_taken, 2);
    }

    #[tokio::test]
    async fn first_snapshot_failure_is_fatal() {
        let mut driver = ScriptedPage::new(vec![Err(anyhow!("tab crashed"))], Vec::new());
        assert!(crawl_pages(&mut driver, 20).await.is_err());
    }

    #[tokio::test]
    async fn advance_failure_keeps_already_extracted_records() {
        let mut driver = ScriptedPage::new(
            vec![Ok(TWO_TILE_PAGE.to_string())],
            vec![Err(anyhow!("control disappeared mid-click"))],
        );
        let records = crawl_pages(&mut driver, 20).await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
