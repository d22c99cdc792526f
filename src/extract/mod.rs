//! Page extraction: listing HTML snapshot in, product records out.
//!
//! Extraction is a pure function of the rendered HTML, which keeps it fully
//! unit-testable against fixture markup. The navigation layer is responsible
//! for getting the DOM into a settled state before snapshotting.

pub mod price;
pub mod selectors;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::record::RawProductRecord;
use selectors::{
    BADGE_SELECTORS, CONTAINER_SELECTORS, IMAGE_SELECTORS, LINK_SELECTORS, PRICE_SELECTORS,
    TITLE_SELECTORS,
};

/// Clearance wording in either site language. Applied to the title and a
/// leading slice of the tile text; kept deliberately permissive (badge OR
/// text match) to favor recall over precision.
static LIQUIDATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(clearance|liquidation|soldes?|sale)\b")
        .expect("hardcoded liquidation pattern is valid")
});

/// Characters of tile text inspected for clearance wording
const SNIPPET_LEN: usize = 160;

/// Extract all product records from a listing page snapshot.
///
/// Containers where no field resolves are dropped; everything else is kept in
/// document order. Never fails: unparseable markup simply yields fewer
/// records.
#[must_use]
pub fn extract_products(html: &str, base_url: &Url) -> Vec<RawProductRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for container_selector in CONTAINER_SELECTORS {
        let Ok(selector) = Selector::parse(container_selector) else {
            continue;
        };
        let containers: Vec<_> = document.select(&selector).collect();
        if containers.is_empty() {
            continue;
        }
        debug!(
            selector = container_selector,
            count = containers.len(),
            "matched product containers"
        );

        for container in containers {
            let title = selectors::resolve_text(container, TITLE_SELECTORS).unwrap_or_default();
            let price_text =
                selectors::resolve_text(container, PRICE_SELECTORS).unwrap_or_default();
            let price = price::parse_price(&price_text);
            let image_url = selectors::resolve_image(container, IMAGE_SELECTORS, base_url);
            let product_url = selectors::resolve_link(container, LINK_SELECTORS, base_url);

            let snippet: String = selectors::collect_text(container)
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            let is_liquidation = selectors::any_match(container, BADGE_SELECTORS)
                || LIQUIDATION_PATTERN.is_match(&title)
                || LIQUIDATION_PATTERN.is_match(&snippet);

            let record = RawProductRecord {
                title,
                price_text,
                price,
                is_liquidation,
                image_url,
                product_url,
            };
            if !record.is_empty() {
                records.push(record);
            }
        }

        // Container variants are mutually exclusive per template generation;
        // the first chain entry that matches anything owns the page.
        break;
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.example.com/en/promotions/clearance.html";

    fn base_url() -> Url {
        Url::parse(BASE).unwrap()
    }

    const TWO_PRODUCT_PAGE: &str = r#"
        <html><body>
          <div class="product-grid">
            <div class="nl-product-card">
              <span class="nl-badge--clearance">Clearance</span>
              <h3 class="nl-product-card__title">Garage Heater 5000W</h3>
              <span class="nl-price--total">129,99 $</span>
              <a class="nl-product-card__no-button" href="/pdp/garage-heater-5000w-0794832p.html">view</a>
              <img class="nl-product-card__image" data-src="/media/heater.jpg">
            </div>
            <div class="nl-product-card">
              <h3 class="nl-product-card__title">Socket Set, 120-pc</h3>
              <span class="nl-price--total">$79.99</span>
              <a class="nl-product-card__no-button" href="/pdp/socket-set-120pc-0588123p.html">view</a>
              <img class="nl-product-card__image" srcset="//cdn.example.com/socket-300.jpg 300w, //cdn.example.com/socket-600.jpg 600w">
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_all_containers_in_order() {
        let records = extract_products(TWO_PRODUCT_PAGE, &base_url());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Garage Heater 5000W");
        assert_eq!(records[1].title, "Socket Set, 120-pc");
    }

    #[test]
    fn prices_are_normalized_per_locale() {
        let records = extract_products(TWO_PRODUCT_PAGE, &base_url());
        assert_eq!(records[0].price, Some(129.99));
        assert_eq!(records[0].price_text, "129,99 $");
        assert_eq!(records[1].price, Some(79.99));
    }

    #[test]
    fn urls_resolve_against_page_base() {
        let records = extract_products(TWO_PRODUCT_PAGE, &base_url());
        assert_eq!(
            records[0].product_url.as_deref(),
            Some("https://www.example.com/pdp/garage-heater-5000w-0794832p.html")
        );
        assert_eq!(
            records[0].image_url.as_deref(),
            Some("https://www.example.com/media/heater.jpg")
        );
        // Protocol-relative srcset entry inherits the page scheme
        assert_eq!(
            records[1].image_url.as_deref(),
            Some("https://cdn.example.com/socket-300.jpg")
        );
    }

    #[test]
    fn badge_or_text_marks_liquidation() {
        let records = extract_products(TWO_PRODUCT_PAGE, &base_url());
        assert!(records[0].is_liquidation, "badge signal");
        assert!(!records[1].is_liquidation, "no signal");

        let html = r#"
            <div class="product-tile">
              <h3 class="product-tile__title">Tente 4 places (Liquidation)</h3>
              <span class="price">89,99 $</span>
            </div>
        "#;
        let records = extract_products(html, &base_url());
        assert_eq!(records.len(), 1);
        assert!(records[0].is_liquidation, "title text signal");
    }

    #[test]
    fn snippet_text_marks_liquidation() {
        let html = r#"
            <div class="product-tile">
              <p>Énorme solde du printemps</p>
              <h3 class="product-tile__title">Perceuse 20V</h3>
              <span class="price">99,99 $</span>
            </div>
        "#;
        let records = extract_products(html, &base_url());
        assert!(records[0].is_liquidation);
    }

    #[test]
    fn empty_containers_are_dropped() {
        let html = r#"
            <div class="product-tile"><div class="sponsored-slot"></div></div>
            <div class="product-tile">
              <h3 class="product-tile__title">Real Product</h3>
            </div>
        "#;
        let records = extract_products(html, &base_url());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Real Product");
    }

    #[test]
    fn page_without_containers_yields_nothing() {
        assert!(extract_products("<html><body><p>404</p></body></html>", &base_url()).is_empty());
    }

    #[test]
    fn missing_title_still_retained_with_price() {
        let html = r#"
            <div class="product-tile">
              <span class="price">12,49 $</span>
            </div>
        "#;
        let records = extract_products(html, &base_url());
        assert_eq!(records.len(), 1);
        assert!(records[0].title.is_empty());
        assert_eq!(records[0].price, Some(12.49));
    }
}
