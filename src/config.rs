//! Runtime configuration.
//!
//! Settings come from an optional TOML file with compiled-in defaults
//! covering the production site; a couple of environment variables
//! override the fetch strategy and remote browser endpoint so runs can
//! be switched without editing config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default config filename looked up in the working directory.
const CONFIG_FILENAME: &str = "bondacquire.toml";

/// How listing and detail pages are retrieved. The extraction chain is
/// agnostic to the choice; it only ever sees HTML or JSON text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FetchVia {
    /// Plain HTTP requests.
    #[default]
    Http,
    /// Headless-browser rendered fetch (requires the `browser` feature).
    Browser,
    /// Direct JSON API calls.
    Api,
}

/// Headless browser options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Page load timeout in seconds.
    #[serde(default = "default_browser_timeout")]
    pub timeout: u64,

    /// Wait for this CSS selector before considering the page loaded.
    #[serde(default)]
    pub wait_for_selector: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g. "ws://localhost:9222"). If set,
    /// connects to an existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,
}

fn default_headless() -> bool {
    true
}

fn default_browser_timeout() -> u64 {
    30
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            timeout: default_browser_timeout(),
            wait_for_selector: None,
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

/// Crawl settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the paginated securities listing.
    #[serde(default = "default_listing_path")]
    pub listing_path: String,

    /// Path of the securities JSON API, used by the `api` strategy.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Server-side filter value for the security kind.
    #[serde(default = "default_security_kind")]
    pub security_kind: String,

    /// Stem the client-side re-filter matches against item kinds. A stem
    /// rather than the full value, since the site inflects the word.
    #[serde(default = "default_security_kind_stem")]
    pub security_kind_stem: String,

    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Courtesy delay between consecutive fetches, in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Safety cap on listing pages, guarding against a corrupted
    /// totalPages counter.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Consecutive page failures tolerated before the crawl aborts with
    /// partial results.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default)]
    pub via: FetchVia,

    /// Custom user agent; None uses the built-in browser-like default.
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Optional TOML file replacing the compiled-in field mapping.
    #[serde(default)]
    pub field_map: Option<PathBuf>,

    #[serde(default)]
    pub browser: BrowserSettings,
}

fn default_base_url() -> String {
    "https://spbexchange.ru".to_string()
}

fn default_listing_path() -> String {
    "/listing/securities/list/".to_string()
}

fn default_api_path() -> String {
    "/ru/listing/securities/api/securities".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_security_kind() -> String {
    "Облигации".to_string()
}

fn default_security_kind_stem() -> String {
    "Облигац".to_string()
}

fn default_sort_by() -> String {
    "securityKind".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_request_delay() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    200
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for Settings {
    fn default() -> Self {
        toml::from_str("").expect("default settings deserialize")
    }
}

impl Settings {
    /// Load settings from an explicit path, or from `bondacquire.toml`
    /// in the working directory, or fall back to defaults. Environment
    /// overrides apply last.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", p.display()))?;
                toml::from_str(&text)?
            }
            None => match std::fs::read_to_string(CONFIG_FILENAME) {
                Ok(text) => toml::from_str(&text)?,
                Err(_) => Self::default(),
            },
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply environment overrides: `BONDACQUIRE_VIA` for the fetch
    /// strategy, `BROWSER_URL` for a remote DevTools endpoint.
    fn apply_env_overrides(&mut self) {
        if let Ok(via) = std::env::var("BONDACQUIRE_VIA") {
            match via.to_lowercase().as_str() {
                "http" => self.via = FetchVia::Http,
                "browser" => self.via = FetchVia::Browser,
                "api" => self.via = FetchVia::Api,
                other => tracing::warn!("ignoring unknown BONDACQUIRE_VIA value: {other}"),
            }
        }
        if let Ok(url) = std::env::var("BROWSER_URL") {
            if !url.is_empty() {
                self.browser.remote_url = Some(url);
            }
        }
    }

    /// URL of one listing page, with the fixed page size and the
    /// server-side security-kind filter.
    pub fn listing_page_url(&self, page: u32) -> String {
        format!(
            "{}{}?page={}&size={}&sortBy={}&sortByDirection=desc&securityKind={}",
            self.base_url,
            self.listing_path,
            page,
            self.page_size,
            self.sort_by,
            urlencoding::encode(&self.security_kind),
        )
    }

    /// URL of one API page with the same filter parameters.
    pub fn api_page_url(&self, page: u32) -> String {
        format!(
            "{}{}?page={}&size={}&securityKind={}",
            self.base_url,
            self.api_path,
            page,
            self.page_size,
            urlencoding::encode(&self.security_kind),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Directory prospectus files are saved under.
    pub fn prospectuses_dir(&self) -> PathBuf {
        self.output_dir.join("Prospectuses")
    }

    /// Dated output path for the reference-data CSV.
    pub fn reference_csv_path(&self, date: chrono::NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("SPBE_ReferenceData_{}.csv", date.format("%Y-%m-%d")))
    }
}
