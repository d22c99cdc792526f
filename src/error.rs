//! Error taxonomy for scrape sessions.
//!
//! Only session-level conditions surface here. Per-item failures (a single
//! image download, a missing selector) are handled where they occur and never
//! escalate past their own record.

use thiserror::Error;

/// Errors that abort a scrape session.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Browser could not be located, downloaded, or launched
    #[error("browser error: {0}")]
    Browser(String),

    /// Initial navigation failed; no pages were extracted
    #[error("navigation error: {0}")]
    Navigation(String),

    /// Writing an output target failed
    #[error("output error writing {target}: {source}")]
    Output {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias for Result with `ScrapeError`
pub type ScrapeResult<T> = Result<T, ScrapeError>;
