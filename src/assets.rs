//! Concurrent image download stage.
//!
//! Downloads run under a global semaphore (default 6 permits). Each item is
//! isolated: a timeout, a non-2xx status, or an oversized payload marks that
//! record's `image_path` absent and moves on. Output order always matches
//! input order regardless of completion order, because `join_all` preserves
//! the order futures were submitted in.

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use futures::future::join_all;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::record::{EnrichedProductRecord, RawProductRecord};

/// Maximum characters of title kept in the image filename slug
const SLUG_MAX_CHARS: usize = 40;

/// Download the primary image for every record that has one.
///
/// Always returns exactly one [`EnrichedProductRecord`] per input record, in
/// input order, even when every download fails.
///
/// # Errors
///
/// Fails only when the image directory cannot be created; individual
/// download failures are absorbed into `image_path: None`.
pub async fn download_images(
    records: Vec<RawProductRecord>,
    client: &Client,
    config: &ScrapeConfig,
) -> Result<Vec<EnrichedProductRecord>> {
    tokio::fs::create_dir_all(config.image_dir())
        .await
        .with_context(|| {
            format!(
                "failed to create image directory {}",
                config.image_dir().display()
            )
        })?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_downloads()));
    let total = records.len();

    let futures = records.into_iter().enumerate().map(|(index, raw)| {
        let semaphore = Arc::clone(&semaphore);
        let client = client.clone();
        let image_dir = config.image_dir().clone();
        let timeout = Duration::from_secs(config.download_timeout_secs());
        let max_bytes = config.max_image_size_bytes();

        async move {
            let Some(url) = raw.image_url.clone() else {
                return EnrichedProductRecord {
                    raw,
                    image_path: None,
                };
            };

            // Filenames are pre-computed from the sequence index, so
            // concurrent writers never collide.
            let filename = image_filename(index, &raw.title, &url);
            let target = image_dir.join(&filename);

            let permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    warn!(url, "download semaphore closed");
                    return EnrichedProductRecord {
                        raw,
                        image_path: None,
                    };
                }
            };

            let image_path = match fetch_to_file(&client, &url, &target, timeout, max_bytes).await {
                Ok(()) => {
                    debug!(url, path = %target.display(), "image saved");
                    Some(target.to_string_lossy().into_owned())
                }
                Err(e) => {
                    warn!(url, error = %e, "image download failed");
                    None
                }
            };
            drop(permit);

            EnrichedProductRecord { raw, image_path }
        }
    });

    let enriched = join_all(futures).await;
    let ok = enriched.iter().filter(|r| r.image_path.is_some()).count();
    info!(total, downloaded = ok, failed = total - ok, "image download stage complete");
    Ok(enriched)
}

async fn fetch_to_file(
    client: &Client,
    url: &str,
    target: &Path,
    timeout: Duration,
    max_bytes: usize,
) -> Result<()> {
    let response = client
        .get(url)
        .timeout(timeout)
        .header(
            "Accept",
            "image/avif,image/webp,image/apng,image/*,*/*;q=0.8",
        )
        .send()
        .await
        .context("request failed")?;

    if !response.status().is_success() {
        return Err(anyhow!("download failed with status {}", response.status()));
    }

    let expected = response.content_length().unwrap_or(0);
    if expected > max_bytes as u64 {
        return Err(anyhow!(
            "image too large: {expected} bytes exceeds limit of {max_bytes}"
        ));
    }

    let mut buffer = if expected > 0 {
        Vec::with_capacity(expected as usize)
    } else {
        Vec::new()
    };

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("failed to read image chunk")?;
        if buffer.len() + chunk.len() > max_bytes {
            return Err(anyhow!(
                "image exceeded size limit during download (max: {max_bytes})"
            ));
        }
        buffer.extend_from_slice(&chunk);
    }

    tokio::fs::write(target, &buffer)
        .await
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(())
}

/// Build the local filename for an image: zero-padded sequence index, a
/// sanitized title slug capped at [`SLUG_MAX_CHARS`] characters, and the
/// extension inferred from the URL path (`.jpg` when unparseable).
#[must_use]
pub fn image_filename(index: usize, title: &str, url: &str) -> String {
    let slug = title_slug(title);
    let ext = url_extension(url).unwrap_or_else(|| "jpg".to_string());
    if slug.is_empty() {
        format!("{index:04}.{ext}")
    } else {
        format!("{index:04}_{slug}.{ext}")
    }
}

fn title_slug(title: &str) -> String {
    let sanitized = sanitize_filename::sanitize(title);
    let slug: String = sanitized
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    // Char-based truncation keeps multi-byte titles (accented French product
    // names) from splitting inside a code point.
    slug.chars().take(SLUG_MAX_CHARS).collect()
}

fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let ext = PathBuf::from(parsed.path())
        .extension()?
        .to_string_lossy()
        .to_lowercase();
    // Query-string noise or versioned paths can produce junk "extensions"
    (!ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_index_slug_extension() {
        let name = image_filename(7, "Garage Heater 5000W", "https://cdn.example.com/a/b/heater.webp");
        assert_eq!(name, "0007_garage-heater-5000w.webp");
    }

    #[test]
    fn missing_extension_defaults_to_jpg() {
        let name = image_filename(0, "Thing", "https://cdn.example.com/image/12345");
        assert_eq!(name, "0000_thing.jpg");
    }

    #[test]
    fn query_string_does_not_leak_into_extension() {
        let name = image_filename(1, "Thing", "https://cdn.example.com/p.png?quality=80&fmt=webp");
        assert_eq!(name, "0001_thing.png");
    }

    #[test]
    fn empty_title_omits_slug() {
        assert_eq!(
            image_filename(12, "", "https://cdn.example.com/x.jpg"),
            "0012.jpg"
        );
    }

    #[test]
    fn long_titles_are_truncated_on_char_boundary() {
        let title = "Élégante étagère de rangement en métal galvanisé pour le garage";
        let name = image_filename(3, title, "https://cdn.example.com/x.jpg");
        let stem = name.trim_start_matches("0003_").trim_end_matches(".jpg");
        assert!(stem.chars().count() <= SLUG_MAX_CHARS);
    }

    #[test]
    fn slug_strips_path_hostile_characters() {
        let name = image_filename(2, "A/B: 50% off!", "https://cdn.example.com/x.gif");
        assert_eq!(name, "0002_ab-50-off.gif");
    }
}
