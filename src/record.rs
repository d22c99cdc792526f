//! Product record model shared by the extraction, download, and output stages.

use serde::{Deserialize, Serialize};

/// One product tile as extracted from a listing page.
///
/// Every field is best-effort: the source site renders several generations of
/// tile markup, so any individual field may be absent. A record survives the
/// retention filter only if at least one of title, price, or image URL is
/// present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProductRecord {
    pub title: String,
    /// Raw matched price text, empty if no selector matched
    pub price_text: String,
    /// Normalized numeric price
    pub price: Option<f64>,
    /// Badge present, or clearance/liquidation wording in the tile text
    pub is_liquidation: bool,
    /// Absolute URL of the primary product image
    pub image_url: Option<String>,
    /// Absolute URL of the product detail page
    pub product_url: Option<String>,
}

impl RawProductRecord {
    /// True when no field carries a usable signal. Such containers are
    /// template placeholders or ad slots and are dropped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.price.is_none() && self.image_url.is_none()
    }
}

/// A [`RawProductRecord`] after the image download stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedProductRecord {
    #[serde(flatten)]
    pub raw: RawProductRecord,
    /// Local path of the downloaded image, `None` if the download failed or
    /// the record had no image URL
    pub image_path: Option<String>,
}
