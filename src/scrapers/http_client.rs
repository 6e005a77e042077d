//! HTTP client with bounded retries, backoff, and a courtesy delay.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::ScrapeError;

/// Default user agent; a real browser string since the site serves a
/// reduced page to obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client wrapper shared by the crawl, detail, and download phases.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    request_delay: Duration,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new client with browser-like default headers and a
    /// persistent cookie store.
    pub fn new(
        timeout: Duration,
        request_delay: Duration,
        max_retries: u32,
        user_agent: Option<&str>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .default_headers(headers)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            request_delay,
            max_retries,
        }
    }

    /// Fetch a page as text, retrying transient failures with
    /// exponential backoff. Applies the courtesy delay after a
    /// successful request.
    pub async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            debug!("GET {url} (attempt {}/{})", attempt + 1, self.max_retries);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await.map_err(|e| ScrapeError::fetch(url, e))?;

                        // A tiny "denied" body with status 200 is the
                        // site's block page.
                        if text.len() < 100 && text.to_lowercase().contains("denied") {
                            warn!("possible access block on {url} (body {} bytes)", text.len());
                            last_error = "access blocked".to_string();
                            self.backoff(attempt, true).await;
                            continue;
                        }

                        tokio::time::sleep(self.request_delay).await;
                        return Ok(text);
                    }

                    last_error = format!("HTTP {status}");
                    if status == StatusCode::FORBIDDEN {
                        warn!(
                            "403 Forbidden on {url}, site may be blocking requests \
                             (attempt {}/{})",
                            attempt + 1,
                            self.max_retries
                        );
                        self.backoff(attempt, true).await;
                    } else if status.is_server_error() {
                        self.backoff(attempt, false).await;
                    } else {
                        // Client errors other than 403 will not improve
                        // with retries.
                        return Err(ScrapeError::fetch(url, format!("HTTP {status}")));
                    }
                }
                Err(e) => {
                    warn!(
                        "request failed (attempt {}/{}): {e}",
                        attempt + 1,
                        self.max_retries
                    );
                    last_error = e.to_string();
                    self.backoff(attempt, false).await;
                }
            }
        }

        Err(ScrapeError::fetch(
            url,
            format!("all {} attempts failed: {last_error}", self.max_retries),
        ))
    }

    /// Download a binary file to `path`, skipping when the target
    /// already exists. Returns whether a download actually happened.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<bool, ScrapeError> {
        if path.exists() {
            debug!("file already exists, skipping: {}", path.display());
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    let bytes = response.bytes().await.map_err(|e| ScrapeError::fetch(url, e))?;
                    tokio::fs::write(path, &bytes).await?;
                    tokio::time::sleep(self.request_delay).await;
                    return Ok(true);
                }
                Ok(response) => {
                    let status = response.status();
                    last_error = format!("HTTP {status}");
                    if status == StatusCode::FORBIDDEN || status.is_server_error() {
                        self.backoff(attempt, status == StatusCode::FORBIDDEN).await;
                    } else {
                        return Err(ScrapeError::fetch(url, format!("HTTP {status}")));
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    self.backoff(attempt, false).await;
                }
            }
        }

        Err(ScrapeError::fetch(
            url,
            format!("all {} attempts failed: {last_error}", self.max_retries),
        ))
    }

    /// Exponential backoff; blocks get a longer base wait.
    async fn backoff(&self, attempt: u32, blocked: bool) {
        let base = if blocked { 3 } else { 1 };
        let wait = Duration::from_secs(base * 2u64.pow(attempt));
        tokio::time::sleep(wait).await;
    }
}
