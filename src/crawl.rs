//! Crawl driver for the paginated securities listing.
//!
//! Fetches one page at a time through the configured strategy, runs the
//! extraction chain on each, and accumulates bond summaries until the
//! pagination counters, an empty page, the page safety cap, or a
//! consecutive-failure streak ends the run. Partial results are valid
//! output.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::ScrapeError;
use crate::extract;
use crate::models::{BondSummary, PageRecord};
use crate::scrapers::FetchPage;

/// Result of one listing crawl, with failure accounting for the run
/// summary.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub bonds: Vec<BondSummary>,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    /// True when the consecutive-failure streak cut the crawl short.
    pub aborted: bool,
}

/// Sequential page-at-a-time driver over a fetch strategy.
pub struct Crawler<'a, F> {
    fetcher: &'a mut F,
    settings: &'a Settings,
}

impl<'a, F: FetchPage> Crawler<'a, F> {
    pub fn new(fetcher: &'a mut F, settings: &'a Settings) -> Self {
        Self { fetcher, settings }
    }

    /// Collect bond summaries across listing pages.
    pub async fn collect_summaries(&mut self) -> CrawlOutcome {
        let mut outcome = CrawlOutcome::default();
        let mut seen_codes: HashSet<String> = HashSet::new();
        let mut consecutive_failures = 0u32;
        let mut page = 0u32;

        info!("Fetching securities listing (kind: {})", self.settings.security_kind);

        while page < self.settings.max_pages {
            match self.fetch_and_decode(page).await {
                Ok(record) => {
                    consecutive_failures = 0;
                    outcome.pages_fetched += 1;

                    if record.content.is_empty() {
                        info!("page {page} has no content, stopping pagination");
                        break;
                    }

                    let summaries = extract::bond_summaries(
                        &record,
                        &self.settings.base_url,
                        &self.settings.security_kind_stem,
                    );

                    let mut added = 0usize;
                    for bond in summaries {
                        if seen_codes.insert(bond.code.clone()) {
                            outcome.bonds.push(bond);
                            added += 1;
                        } else {
                            warn!("duplicate security code {} dropped", bond.code);
                        }
                    }

                    info!(
                        "page {}/{}: {} bonds (total: {})",
                        page + 1,
                        record.total_pages,
                        added,
                        outcome.bonds.len()
                    );

                    // 0-based, exclusive upper bound.
                    if page + 1 >= record.total_pages {
                        info!("reached last page ({}/{})", page + 1, record.total_pages);
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    outcome.pages_failed += 1;
                    consecutive_failures += 1;
                    warn!("page {page} failed: {e}");

                    if consecutive_failures >= self.settings.max_consecutive_failures {
                        warn!(
                            "{consecutive_failures} consecutive page failures, aborting crawl \
                             with {} bonds collected",
                            outcome.bonds.len()
                        );
                        outcome.aborted = true;
                        break;
                    }
                    page += 1;
                }
            }
        }

        info!(
            "listing crawl done: {} bonds, {} pages fetched, {} failed",
            outcome.bonds.len(),
            outcome.pages_fetched,
            outcome.pages_failed
        );
        outcome
    }

    async fn fetch_and_decode(&mut self, page: u32) -> Result<PageRecord, ScrapeError> {
        let text = self.fetcher.fetch_listing_page(page).await?;
        extract::extract_page_record(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Scripted fetcher: `None` entries fail, pages past the end fail.
    struct FakeFetcher {
        pages: Vec<Option<String>>,
        calls: Vec<u32>,
    }

    impl FakeFetcher {
        fn new(pages: Vec<Option<String>>) -> Self {
            Self {
                pages,
                calls: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl FetchPage for FakeFetcher {
        async fn fetch_listing_page(&mut self, page: u32) -> Result<String, ScrapeError> {
            self.calls.push(page);
            match self.pages.get(page as usize) {
                Some(Some(text)) => Ok(text.clone()),
                _ => Err(ScrapeError::Fetch {
                    url: format!("page-{page}"),
                    reason: "scripted failure".to_string(),
                }),
            }
        }

        async fn fetch_url(&mut self, url: &str) -> Result<String, ScrapeError> {
            Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: "not scripted".to_string(),
            })
        }
    }

    fn page_json(codes: &[&str], total_pages: u32) -> String {
        let content: Vec<_> = codes
            .iter()
            .map(|code| json!({"srtsCode": code, "sisinCode": format!("RU{code}"),
                               "fullName": "Эмитент", "securityKind": "Облигации"}))
            .collect();
        json!({
            "content": content,
            "totalPages": total_pages,
            "totalElements": codes.len(),
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_driver_fetches_all_pages_then_stops() {
        let mut fetcher = FakeFetcher::new(vec![
            Some(page_json(&["A"], 3)),
            Some(page_json(&["B"], 3)),
            Some(page_json(&["C"], 3)),
            Some(page_json(&["D"], 3)),
        ]);
        let settings = Settings::default();

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        assert_eq!(fetcher.calls, vec![0, 1, 2]);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.bonds.len(), 3);
        assert!(!outcome.aborted);
    }

    #[tokio::test]
    async fn test_driver_stops_on_empty_first_page() {
        let mut fetcher = FakeFetcher::new(vec![Some(page_json(&[], 5))]);
        let settings = Settings::default();

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        assert_eq!(fetcher.calls, vec![0]);
        assert!(outcome.bonds.is_empty());
    }

    #[tokio::test]
    async fn test_driver_stops_after_one_fetch_when_total_pages_zero() {
        let mut fetcher = FakeFetcher::new(vec![Some(page_json(&["A"], 0))]);
        let settings = Settings::default();

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        assert_eq!(fetcher.calls, vec![0]);
        assert_eq!(outcome.bonds.len(), 1);
    }

    #[tokio::test]
    async fn test_driver_drops_duplicate_codes_across_pages() {
        let mut fetcher = FakeFetcher::new(vec![
            Some(page_json(&["A", "B"], 2)),
            Some(page_json(&["B", "C"], 2)),
        ]);
        let settings = Settings::default();

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        let codes: Vec<_> = outcome.bonds.iter().map(|b| b.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_driver_aborts_on_consecutive_failure_streak() {
        let mut fetcher = FakeFetcher::new(vec![None, None, None, None]);
        let settings = Settings::default();

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        assert_eq!(fetcher.calls, vec![0, 1, 2]);
        assert_eq!(outcome.pages_failed, 3);
        assert!(outcome.aborted);
        assert!(outcome.bonds.is_empty());
    }

    #[tokio::test]
    async fn test_driver_recovers_from_isolated_failure_with_partial_results() {
        let mut fetcher = FakeFetcher::new(vec![
            None,
            Some(page_json(&["B"], 2)),
        ]);
        let settings = Settings::default();

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        assert_eq!(fetcher.calls, vec![0, 1]);
        assert_eq!(outcome.pages_failed, 1);
        assert!(!outcome.aborted);
        assert_eq!(outcome.bonds.len(), 1);
    }

    #[tokio::test]
    async fn test_driver_respects_page_safety_cap() {
        // Every page claims many more to come; the cap must stop it.
        let pages: Vec<_> = (0..10).map(|_| Some(page_json(&["X"], 1000))).collect();
        let mut fetcher = FakeFetcher::new(pages);
        let mut settings = Settings::default();
        settings.max_pages = 5;

        let outcome = Crawler::new(&mut fetcher, &settings).collect_summaries().await;

        assert_eq!(fetcher.calls.len(), 5);
        assert_eq!(outcome.pages_fetched, 5);
    }
}
