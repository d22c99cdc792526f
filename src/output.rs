//! Output persistence: pretty JSON and fixed-column CSV.
//!
//! Both targets are whole-file replacements; there is no append or merge
//! semantics. The two writes are independent: the session attempts each and
//! reports failures per target.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::record::EnrichedProductRecord;

/// CSV column contract, consumed by downstream aggregation scripts. Order is
/// load-bearing; do not reorder.
pub const CSV_COLUMNS: [&str; 7] = [
    "title",
    "price",
    "price_raw",
    "liquidation",
    "url",
    "image",
    "image_path",
];

/// Write the full record set as a pretty-printed JSON array.
///
/// # Errors
///
/// Fails on serialization or filesystem errors; the caller decides whether
/// to still attempt the CSV target.
pub async fn write_json(path: &Path, records: &[EnrichedProductRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("failed to serialize records")?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), records = records.len(), "wrote JSON output");
    Ok(())
}

/// Write the full record set as CSV with the [`CSV_COLUMNS`] header.
///
/// # Errors
///
/// Fails on serialization or filesystem errors.
pub async fn write_csv(path: &Path, records: &[EnrichedProductRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_COLUMNS)
        .context("failed to write CSV header")?;

    for record in records {
        let price = record
            .raw
            .price
            .map(|p| format!("{p}"))
            .unwrap_or_default();
        writer
            .write_record([
                record.raw.title.as_str(),
                price.as_str(),
                record.raw.price_text.as_str(),
                if record.raw.is_liquidation { "true" } else { "false" },
                record.raw.product_url.as_deref().unwrap_or(""),
                record.raw.image_url.as_deref().unwrap_or(""),
                record.image_path.as_deref().unwrap_or(""),
            ])
            .context("failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .context("failed to flush CSV buffer")?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), records = records.len(), "wrote CSV output");
    Ok(())
}
