//! Browser-rendered fetcher for when the site refuses plain HTTP.
//!
//! Drives a headless Chromium over CDP. The handle is an explicit,
//! scoped resource owned by the fetch strategy: launched lazily on
//! first use and closed when the run releases it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::scrapers::http_client::USER_AGENT;

/// Settle time after navigation for late-rendering framework scripts.
const RENDER_SETTLE: Duration = Duration::from_millis(500);

/// Browser-based page fetcher.
pub struct BrowserFetcher {
    settings: BrowserSettings,
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserFetcher {
    /// Common Chromium executable locations.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: None,
            handler_task: None,
        }
    }

    fn find_chrome() -> Result<PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chromium at: {path}");
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chromium in PATH: {path}");
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found; install it or set browser.remote_url"
        ))
    }

    /// Launch or connect to a browser if not already running.
    async fn ensure_browser(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        if let Some(remote_url) = self.settings.remote_url.clone() {
            return self.connect_remote(&remote_url).await;
        }

        info!("Launching browser (headless={})", self.settings.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        if !self.settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--window-size=1920,1080")
            .arg("--disable-blink-features=AutomationControlled");

        for arg in &self.settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        self.handler_task = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);

        Ok(())
    }

    /// Connect to a remote Chrome DevTools endpoint.
    async fn connect_remote(&mut self, url: &str) -> Result<()> {
        info!("Connecting to remote browser at {url}");

        let (browser, mut handler) = Browser::connect(url)
            .await
            .context("Failed to connect to remote browser")?;

        self.handler_task = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);

        Ok(())
    }

    /// Fetch a URL and return the rendered HTML.
    pub async fn fetch(&mut self, url: &str) -> Result<String> {
        self.ensure_browser().await?;
        let browser = self.browser.as_ref().expect("browser just ensured");

        let page = browser.new_page("about:blank").await?;

        // Set a realistic user agent before any navigation.
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await?;

        debug!("Navigating to {url}");
        page.goto(url).await?;

        let nav_timeout = Duration::from_secs(self.settings.timeout);
        if tokio::time::timeout(nav_timeout, page.wait_for_navigation())
            .await
            .is_err()
        {
            warn!("Timeout waiting for navigation on {url}");
        }

        // Let the framework hydrate and flush its streamed payload.
        tokio::time::sleep(RENDER_SETTLE).await;

        if let Some(ref selector) = self.settings.wait_for_selector {
            debug!("Waiting for selector: {selector}");
            match tokio::time::timeout(nav_timeout, page.find_element(selector.as_str())).await {
                Ok(Ok(_)) => debug!("Selector found"),
                Ok(Err(e)) => warn!("Selector not found: {e}"),
                Err(_) => warn!("Timeout waiting for selector"),
            }
        }

        let content = page.content().await?;
        let _ = page.close().await;

        Ok(content)
    }

    /// Shut the browser down. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Error closing browser: {e}");
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}
