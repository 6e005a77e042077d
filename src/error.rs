//! Error taxonomy for the crawl and extraction pipeline.

use thiserror::Error;

/// Errors that can occur while fetching or extracting exchange data.
///
/// Per-page and per-field errors are isolated by the callers: a single
/// failed page is skipped and the crawl continues until the
/// consecutive-failure threshold is exceeded.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network or browser failure to retrieve a page, after retries.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Expected structural markers were absent from the page.
    #[error("no page payload found: {0}")]
    NotFound(String),

    /// A boundary-found string turned out not to be valid JSON.
    #[error("page JSON decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A detail-page field could not be located or transformed.
    #[error("field extraction failed: {0}")]
    FieldExtraction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Build a fetch error from any displayable cause.
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        ScrapeError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
