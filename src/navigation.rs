//! Pagination state machine over a live browser page.
//!
//! Two pagination idioms exist in the wild for this catalog: incremental
//! "load more" expansion and true next-page navigation. They are mutually
//! exclusive per template, but both selector sets are probed every iteration
//! since small result sets can surface either. Decision priority: expand,
//! then paginate, then done.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;

/// Store-selection or locale prompt close controls, most specific first.
/// Dismissal is best-effort; an undismissed overlay degrades extraction but
/// does not abort the session.
const INTERSTITIAL_CLOSE_SELECTORS: &[&str] = &[
    "[data-testid='store-modal-close']",
    ".nl-modal__close-button",
    "button[aria-label='Close']",
    "button[aria-label='Fermer']",
    ".modal__close",
];

/// Product list container, used as the "page is ready" signal
const LIST_SELECTORS: &[&str] = &[
    "[data-testid='product-grid']",
    ".nl-plp__results",
    ".product-grid",
    "ul.product-list",
];

const LOAD_MORE_SELECTORS: &[&str] = &[
    "[data-testid='load-more']",
    "button.nl-load-more__button",
    "button.load-more",
    "button[class*='load-more']",
];

const NEXT_PAGE_SELECTORS: &[&str] = &[
    "[data-testid='pagination-next']",
    "a[rel='next']",
    ".pagination__next a",
    "button[aria-label='Next page']",
];

/// Interval between readiness polls
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Settle delay after a pagination click, before the next DOM snapshot
const SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Outcome of one pagination decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    /// "Load more" was clicked; same logical page, larger DOM
    Expanded,
    /// "Next page" was clicked; new page
    Paginated,
    /// Neither control is actionable; catalog exhausted
    Done,
}

/// Pure decision core of the state machine, split out for testability.
/// Expansion wins over pagination; both absent means done.
#[must_use]
pub fn decide_action(load_more_visible: bool, next_enabled: bool) -> PageAction {
    if load_more_visible {
        PageAction::Expanded
    } else if next_enabled {
        PageAction::Paginated
    } else {
        PageAction::Done
    }
}

/// Drives one browser page through the catalog.
pub struct NavigationController<'a> {
    page: &'a Page,
    config: &'a ScrapeConfig,
}

impl<'a> NavigationController<'a> {
    #[must_use]
    pub fn new(page: &'a Page, config: &'a ScrapeConfig) -> Self {
        Self { page, config }
    }

    /// Navigate to the start URL and dismiss any interstitial.
    ///
    /// # Errors
    ///
    /// Fails when the initial navigation itself fails or times out; this is
    /// the one navigation error treated as fatal by the session.
    pub async fn load_initial(&self, url: &str) -> Result<()> {
        info!(url, "navigating to catalog start page");

        let timeout = Duration::from_secs(self.config.navigation_timeout_secs());
        tokio::time::timeout(timeout, async {
            self.page
                .goto(url)
                .await
                .context("failed to navigate to start URL")?;
            self.page
                .wait_for_navigation()
                .await
                .context("failed to wait for initial page load")?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(|_| anyhow::anyhow!("initial navigation timed out after {timeout:?}"))??;

        self.dismiss_interstitial().await;
        Ok(())
    }

    /// Try each close selector and click the first visible one. Non-fatal in
    /// every failure mode; most sessions never see the interstitial.
    pub async fn dismiss_interstitial(&self) {
        for selector in INTERSTITIAL_CLOSE_SELECTORS {
            if !self.is_visible(selector).await {
                continue;
            }
            match self.page.find_element(*selector).await {
                Ok(element) => match element.click().await {
                    Ok(_) => {
                        info!(selector, "dismissed interstitial");
                        tokio::time::sleep(POLL_INTERVAL).await;
                        return;
                    }
                    Err(e) => debug!(selector, error = %e, "interstitial click failed"),
                },
                Err(e) => debug!(selector, error = %e, "interstitial lookup failed"),
            }
        }
        debug!("no interstitial visible");
    }

    /// Wait until a product list container appears, bounded by
    /// `list_wait_timeout_secs`. Timing out is non-fatal: some template
    /// variants render tiles without a recognizable grid wrapper, so the
    /// caller proceeds with whatever the snapshot holds.
    pub async fn wait_for_product_list(&self) {
        let deadline = Instant::now() + Duration::from_secs(self.config.list_wait_timeout_secs());
        loop {
            for selector in LIST_SELECTORS {
                if self.page.find_element(*selector).await.is_ok() {
                    debug!(selector, "product list container present");
                    return;
                }
            }
            if Instant::now() >= deadline {
                warn!(
                    timeout_secs = self.config.list_wait_timeout_secs(),
                    "product list container never appeared, proceeding with current DOM"
                );
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Evaluate the pagination controls once and act on the decision.
    ///
    /// # Errors
    ///
    /// Only fails when a click on a control that was just probed visible
    /// fails, which indicates a broken page session rather than a missing
    /// control.
    pub async fn advance(&self) -> Result<PageAction> {
        let load_more = self.first_visible(LOAD_MORE_SELECTORS).await;
        let next_page = match load_more {
            // Controls are mutually exclusive; skip the second probe when the
            // first already decided.
            Some(_) => None,
            None => self.first_enabled(NEXT_PAGE_SELECTORS).await,
        };

        let action = decide_action(load_more.is_some(), next_page.is_some());
        match action {
            PageAction::Expanded => {
                let selector = load_more.unwrap_or(LOAD_MORE_SELECTORS[0]);
                self.click_and_settle(selector)
                    .await
                    .context("failed to click load-more control")?;
                debug!(selector, "expanded listing in place");
            }
            PageAction::Paginated => {
                let selector = next_page.unwrap_or(NEXT_PAGE_SELECTORS[0]);
                self.click_and_settle(selector)
                    .await
                    .context("failed to click next-page control")?;
                debug!(selector, "navigated to next page");
            }
            PageAction::Done => {
                info!("no pagination controls remain");
            }
        }
        Ok(action)
    }

    async fn click_and_settle(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("pagination control '{selector}' disappeared"))?;
        element
            .click()
            .await
            .with_context(|| format!("click on '{selector}' failed"))?;

        // Next-page templates trigger real navigation, load-more templates
        // patch the DOM in place; wait_for_navigation resolves immediately in
        // the latter case, so a settle delay covers both.
        if let Err(e) = self.page.wait_for_navigation().await {
            debug!(error = %e, "wait_for_navigation after pagination click");
        }
        tokio::time::sleep(SETTLE_DELAY).await;
        Ok(())
    }

    async fn first_visible(&self, selectors: &[&'static str]) -> Option<&'static str> {
        for selector in selectors {
            if self.is_visible(selector).await {
                return Some(selector);
            }
        }
        None
    }

    async fn first_enabled(&self, selectors: &[&'static str]) -> Option<&'static str> {
        for selector in selectors {
            if self.is_visible(selector).await && self.is_enabled(selector).await {
                return Some(selector);
            }
        }
        None
    }

    /// Visibility probe via layout: the element exists and occupies space.
    async fn is_visible(&self, selector: &str) -> bool {
        let script = format!(
            r"(() => {{
                const el = document.querySelector({selector:?});
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 && rect.height > 0;
            }})()"
        );
        match self.page.evaluate(script).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn is_enabled(&self, selector: &str) -> bool {
        let script = format!(
            r"(() => {{
                const el = document.querySelector({selector:?});
                if (!el) return false;
                if (el.disabled) return false;
                return el.getAttribute('aria-disabled') !== 'true';
            }})()"
        );
        match self.page.evaluate(script).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Current rendered HTML of the page.
    ///
    /// # Errors
    ///
    /// Fails on browser communication errors.
    pub async fn snapshot(&self) -> Result<String> {
        self.page
            .content()
            .await
            .context("failed to snapshot page content")
    }
}
