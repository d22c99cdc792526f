//! Selector fallback chains and field resolution.
//!
//! The listing page has shipped at least three generations of product tile
//! markup, so every logical field is resolved through an ordered chain of
//! candidate selectors, from most specific (test-id attributes) to most
//! generic (bare tags). Resolution never fails; an exhausted chain yields
//! `None`.

use scraper::{ElementRef, Selector};
use url::Url;

/// Product tile containers, one per product
pub const CONTAINER_SELECTORS: &[&str] = &[
    "[data-testid='product-tile']",
    ".nl-product-card",
    ".product-tile",
    "li.product-grid__item",
    ".product-item",
];

pub const TITLE_SELECTORS: &[&str] = &[
    "[data-testid='product-title']",
    ".nl-product-card__title",
    ".product-tile__title",
    ".product-item__name",
    "h2",
    "h3",
];

pub const PRICE_SELECTORS: &[&str] = &[
    "[data-testid='price-total']",
    ".nl-price--total",
    ".product-tile__price",
    ".price__value",
    ".price",
];

pub const IMAGE_SELECTORS: &[&str] = &[
    "[data-testid='product-image'] img",
    "img.nl-product-card__image",
    ".product-tile__image img",
    "picture img",
    "img",
];

pub const LINK_SELECTORS: &[&str] = &[
    "a[data-testid='product-link']",
    "a.nl-product-card__no-button",
    "a.product-tile__link",
    "a[href*='/pdp/']",
    "a[href]",
];

pub const BADGE_SELECTORS: &[&str] = &[
    "[data-testid='clearance-badge']",
    ".nl-badge--clearance",
    ".product-tile__badge--clearance",
    "[class*='liquidation']",
];

/// Image URL attributes in priority order. Lazy-loading tile variants park the
/// real URL in a data attribute and leave `src` as a transparent placeholder.
const IMAGE_URL_ATTRS: &[&str] = &["src", "data-src", "data-original", "data-image", "srcset"];

/// Resolve the first non-empty text value across a candidate chain.
#[must_use]
pub fn resolve_text(element: ElementRef<'_>, candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        if let Some(found) = element.select(&selector).next() {
            let text = collect_text(found);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// True if any candidate selector matches at all (presence check, used for
/// the clearance badge).
#[must_use]
pub fn any_match(element: ElementRef<'_>, candidates: &[&str]) -> bool {
    candidates.iter().any(|candidate| {
        Selector::parse(candidate)
            .map(|selector| element.select(&selector).next().is_some())
            .unwrap_or(false)
    })
}

/// Resolve the product link as an absolute URL.
#[must_use]
pub fn resolve_link(element: ElementRef<'_>, candidates: &[&str], base: &Url) -> Option<String> {
    for candidate in candidates {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        if let Some(found) = element.select(&selector).next()
            && let Some(href) = found.value().attr("href")
            && let Some(absolute) = absolutize(base, href)
        {
            return Some(absolute);
        }
    }
    None
}

/// Resolve the primary image as an absolute URL, trying each candidate
/// selector and, per match, each URL attribute in priority order.
#[must_use]
pub fn resolve_image(element: ElementRef<'_>, candidates: &[&str], base: &Url) -> Option<String> {
    for candidate in candidates {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        for found in element.select(&selector) {
            for attr in IMAGE_URL_ATTRS {
                let Some(value) = found.value().attr(attr) else {
                    continue;
                };
                let value = if *attr == "srcset" {
                    match first_srcset_url(value) {
                        Some(v) => v,
                        None => continue,
                    }
                } else {
                    value.trim()
                };
                if value.is_empty() {
                    continue;
                }
                if let Some(absolute) = absolutize(base, value) {
                    return Some(absolute);
                }
            }
        }
    }
    None
}

/// First URL token of a `srcset` value: everything before the first comma,
/// then the first whitespace-delimited token (the descriptor is dropped).
#[must_use]
pub fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()?
        .split_whitespace()
        .next()
        .filter(|s| !s.is_empty())
}

/// Join a possibly relative URL against the page base. Non-http(s) results
/// (data:, javascript:) are rejected.
#[must_use]
pub fn absolutize(base: &Url, value: &str) -> Option<String> {
    let joined = base.join(value.trim()).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Concatenated, whitespace-normalized text of an element subtree.
#[must_use]
pub fn collect_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn fragment(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    fn base() -> Url {
        Url::parse("https://www.example.com/en/clearance.html").unwrap()
    }

    #[test]
    fn second_candidate_wins_when_first_absent() {
        let doc = fragment(r#"<div><span class="b">match</span></div>"#);
        let root = doc.root_element();
        let value = resolve_text(root, &[".a", ".b"]);
        assert_eq!(value.as_deref(), Some("match"));
    }

    #[test]
    fn first_candidate_takes_priority() {
        let doc = fragment(r#"<div><span class="a">first</span><span class="b">second</span></div>"#);
        let value = resolve_text(doc.root_element(), &[".a", ".b"]);
        assert_eq!(value.as_deref(), Some("first"));
    }

    #[test]
    fn empty_match_falls_through_to_next_candidate() {
        let doc = fragment(r#"<div><span class="a">  </span><span class="b">real</span></div>"#);
        let value = resolve_text(doc.root_element(), &[".a", ".b"]);
        assert_eq!(value.as_deref(), Some("real"));
    }

    #[test]
    fn exhausted_chain_is_none() {
        let doc = fragment("<div><p>nothing relevant</p></div>");
        assert_eq!(resolve_text(doc.root_element(), &[".a", ".b"]), None);
    }

    #[test]
    fn image_prefers_src_over_data_src() {
        let doc = fragment(r#"<div><img src="/a.jpg" data-src="/b.jpg"></div>"#);
        let value = resolve_image(doc.root_element(), &["img"], &base());
        assert_eq!(value.as_deref(), Some("https://www.example.com/a.jpg"));
    }

    #[test]
    fn image_falls_back_to_data_attributes() {
        let doc = fragment(r#"<div><img data-original="/lazy.webp"></div>"#);
        let value = resolve_image(doc.root_element(), &["img"], &base());
        assert_eq!(value.as_deref(), Some("https://www.example.com/lazy.webp"));
    }

    #[test]
    fn srcset_takes_first_url_token() {
        let doc =
            fragment(r#"<div><img srcset="/small.jpg 1x, /large.jpg 2x"></div>"#);
        let value = resolve_image(doc.root_element(), &["img"], &base());
        assert_eq!(value.as_deref(), Some("https://www.example.com/small.jpg"));
    }

    #[test]
    fn data_urls_are_rejected() {
        let doc = fragment(r#"<div><img src="data:image/gif;base64,R0lGOD"></div>"#);
        assert_eq!(resolve_image(doc.root_element(), &["img"], &base()), None);
    }

    #[test]
    fn relative_link_is_absolutized() {
        let doc = fragment(r##"<div><a href="/pdp/heater-123.html">x</a></div>"##);
        let value = resolve_link(doc.root_element(), LINK_SELECTORS, &base());
        assert_eq!(
            value.as_deref(),
            Some("https://www.example.com/pdp/heater-123.html")
        );
    }

    #[test]
    fn badge_presence_check() {
        let doc = fragment(r#"<div><span class="nl-badge--clearance">Liquidation</span></div>"#);
        assert!(any_match(doc.root_element(), BADGE_SELECTORS));
        let doc = fragment("<div><span>Regular</span></div>");
        assert!(!any_match(doc.root_element(), BADGE_SELECTORS));
    }

    #[test]
    fn first_srcset_url_edge_cases() {
        assert_eq!(first_srcset_url("/a.jpg 1x, /b.jpg 2x"), Some("/a.jpg"));
        assert_eq!(first_srcset_url("/only.jpg"), Some("/only.jpg"));
        assert_eq!(first_srcset_url(""), None);
    }
}
