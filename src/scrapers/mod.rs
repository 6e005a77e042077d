//! Fetch strategies for listing and detail pages.
//!
//! The crawl and extraction logic never depends on which strategy is
//! active; a fetcher hands back HTML or JSON text and the chain treats
//! it the same either way.

#[cfg(feature = "browser")]
pub mod browser;
pub mod http_client;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use http_client::HttpClient;

use async_trait::async_trait;

use crate::config::{FetchVia, Settings};
use crate::error::ScrapeError;

/// Source of page text for the crawl driver. Implemented by the real
/// strategy dispatcher and by scripted fakes in tests.
#[async_trait]
pub trait FetchPage: Send {
    /// Retrieve the text of one listing page by index, with the fixed
    /// page size and security-kind filter applied.
    async fn fetch_listing_page(&mut self, page: u32) -> Result<String, ScrapeError>;

    /// Retrieve the text of an arbitrary URL (detail pages).
    async fn fetch_url(&mut self, url: &str) -> Result<String, ScrapeError>;
}

/// Strategy dispatcher selected by configuration.
pub struct PageFetcher {
    via: FetchVia,
    settings: Settings,
    client: HttpClient,
    #[cfg(feature = "browser")]
    browser: Option<BrowserFetcher>,
}

impl PageFetcher {
    /// Build a fetcher for the configured strategy. The browser handle
    /// is created lazily on first use.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        #[cfg(not(feature = "browser"))]
        if settings.via == FetchVia::Browser {
            anyhow::bail!("browser fetch strategy requested but the browser feature is not compiled in");
        }

        let client = HttpClient::new(
            settings.request_timeout(),
            settings.request_delay(),
            settings.max_retries,
            settings.user_agent.as_deref(),
        );

        Ok(Self {
            via: settings.via,
            settings: settings.clone(),
            client,
            #[cfg(feature = "browser")]
            browser: None,
        })
    }

    /// The plain HTTP client, for binary downloads regardless of the
    /// page strategy.
    pub fn http_client(&self) -> &HttpClient {
        &self.client
    }

    /// Release the browser handle, if one was started.
    pub async fn close(&mut self) {
        #[cfg(feature = "browser")]
        if let Some(ref mut browser) = self.browser {
            browser.close().await;
        }
    }

    #[cfg(feature = "browser")]
    async fn fetch_rendered(&mut self, url: &str) -> Result<String, ScrapeError> {
        let browser = self
            .browser
            .get_or_insert_with(|| BrowserFetcher::new(self.settings.browser.clone()));
        browser
            .fetch(url)
            .await
            .map_err(|e| ScrapeError::fetch(url, e))
    }
}

#[async_trait]
impl FetchPage for PageFetcher {
    async fn fetch_listing_page(&mut self, page: u32) -> Result<String, ScrapeError> {
        let url = match self.via {
            FetchVia::Api => self.settings.api_page_url(page),
            _ => self.settings.listing_page_url(page),
        };
        self.fetch_url(&url).await
    }

    async fn fetch_url(&mut self, url: &str) -> Result<String, ScrapeError> {
        match self.via {
            FetchVia::Http | FetchVia::Api => self.client.get_text(url).await,
            FetchVia::Browser => {
                #[cfg(feature = "browser")]
                {
                    self.fetch_rendered(url).await
                }
                #[cfg(not(feature = "browser"))]
                {
                    Err(ScrapeError::fetch(url, "browser feature not compiled in"))
                }
            }
        }
    }
}
