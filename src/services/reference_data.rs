//! Reference-data acquisition service.
//!
//! Runs the listing crawl, visits each bond's card page, and flushes
//! the accumulated records to the dated CSV. A completed run always
//! produces a CSV and a summary of what was skipped, never a silent
//! empty output.

use std::path::PathBuf;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Settings;
use crate::crawl::Crawler;
use crate::detail;
use crate::export;
use crate::fields::{self, FieldMap};
use crate::models::{BondDetail, BondSummary};
use crate::scrapers::FetchPage;

/// Counters for the run summary.
#[derive(Debug, Default)]
pub struct ReferenceDataResult {
    pub output_path: Option<PathBuf>,
    /// Bonds found by the listing crawl; reusable by the prospectus
    /// phase without a second crawl.
    pub bonds: Vec<BondSummary>,
    pub bonds_parsed: usize,
    pub details_skipped: usize,
    pub details_failed: usize,
    pub listing_pages_failed: u32,
    pub listing_aborted: bool,
}

/// Orchestrates one reference-data run.
pub struct ReferenceDataService<'a> {
    settings: &'a Settings,
    field_map: &'a FieldMap,
}

impl<'a> ReferenceDataService<'a> {
    pub fn new(settings: &'a Settings, field_map: &'a FieldMap) -> Self {
        Self {
            settings,
            field_map,
        }
    }

    /// Crawl the listing and parse every bond's detail page. A nonzero
    /// `limit` caps the number of detail pages visited.
    pub async fn run<F: FetchPage>(
        &self,
        fetcher: &mut F,
        limit: usize,
    ) -> anyhow::Result<ReferenceDataResult> {
        let outcome = Crawler::new(fetcher, self.settings).collect_summaries().await;

        let mut result = ReferenceDataResult {
            bonds: outcome.bonds,
            listing_pages_failed: outcome.pages_failed,
            listing_aborted: outcome.aborted,
            ..Default::default()
        };

        if limit > 0 && result.bonds.len() > limit {
            info!("limiting detail parsing to {limit} of {} bonds", result.bonds.len());
            result.bonds.truncate(limit);
        }

        let bonds = result.bonds.clone();
        let details = self.collect_details(fetcher, &bonds, &mut result).await;
        result.bonds_parsed = details.len();

        let path = self
            .settings
            .reference_csv_path(Local::now().date_naive());
        export::write_reference_csv(&path, &details, self.field_map)?;
        info!("saved {} bonds to {}", details.len(), path.display());
        result.output_path = Some(path);

        if result.details_failed > 0 || result.listing_pages_failed > 0 {
            warn!(
                "run completed with failures: {} listing pages, {} detail pages",
                result.listing_pages_failed, result.details_failed
            );
        }

        Ok(result)
    }

    async fn collect_details<F: FetchPage>(
        &self,
        fetcher: &mut F,
        bonds: &[BondSummary],
        result: &mut ReferenceDataResult,
    ) -> Vec<BondDetail> {
        let pb = ProgressBar::new(bonds.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut details = Vec::with_capacity(bonds.len());

        for bond in bonds {
            pb.set_message(bond.code.clone());

            match self.parse_one(fetcher, bond).await {
                Ok(Some(detail)) => details.push(detail),
                Ok(None) => {
                    result.details_skipped += 1;
                }
                Err(e) => {
                    warn!("bond {} failed: {e}", bond.code);
                    result.details_failed += 1;
                }
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
        details
    }

    async fn parse_one<F: FetchPage>(
        &self,
        fetcher: &mut F,
        bond: &BondSummary,
    ) -> Result<Option<BondDetail>, crate::error::ScrapeError> {
        let html = fetcher.fetch_url(&bond.url).await?;

        let Some(mut detail) = detail::parse_bond_detail(&html, self.field_map)? else {
            return Ok(None);
        };

        detail.set(fields::FIELD_SECURITY_SYMBOL, bond.code.clone());

        // The listing already knows these; fill them in when the card
        // page left them blank.
        if detail.get(fields::FIELD_ISIN).unwrap_or_default().is_empty() {
            detail.set(fields::FIELD_ISIN, bond.isin.clone());
        }
        if detail
            .get(fields::FIELD_FULL_NAME_ISSUER)
            .unwrap_or_default()
            .is_empty()
        {
            detail.set(fields::FIELD_FULL_NAME_ISSUER, bond.issuer_name.clone());
        }

        Ok(Some(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapFetcher {
        listing: String,
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl FetchPage for MapFetcher {
        async fn fetch_listing_page(&mut self, page: u32) -> Result<String, ScrapeError> {
            if page == 0 {
                Ok(self.listing.clone())
            } else {
                Err(ScrapeError::NotFound("one page only".to_string()))
            }
        }

        async fn fetch_url(&mut self, url: &str) -> Result<String, ScrapeError> {
            self.pages.get(url).cloned().ok_or_else(|| ScrapeError::Fetch {
                url: url.to_string(),
                reason: "unknown url".to_string(),
            })
        }
    }

    fn card_page(category: &str, isin: &str) -> String {
        format!(
            r#"<html><body><ul>
            <li class="SecuritiesField_item__x"><h3 class="SecuritiesField_itemTitle__x"><div>Вид, категория (тип) ценной бумаги</div></h3><div class="SecuritiesField_itemDesc__x">{category}</div></li>
            <li class="SecuritiesField_item__x"><h3 class="SecuritiesField_itemTitle__x"><div>ISIN код</div></h3><div class="SecuritiesField_itemDesc__x">{isin}</div></li>
            </ul></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_run_produces_csv_and_counters() {
        let settings = {
            let mut s = Settings::default();
            s.output_dir = tempfile::tempdir().unwrap().keep();
            s
        };
        let listing = serde_json::json!({
            "content": [
                {"srtsCode": "BO1", "sisinCode": "RU1", "fullName": "Acme",
                 "securityKind": "Облигации"},
                {"srtsCode": "BO2", "sisinCode": "RU2", "fullName": "Betamax",
                 "securityKind": "Облигации"},
            ],
            "totalPages": 1,
            "totalElements": 2,
        })
        .to_string();

        let mut pages = HashMap::new();
        pages.insert(
            format!("{}/listing/securities/BO1/", settings.base_url),
            card_page("Облигации", "RU000A0TEST1"),
        );
        // BO2's card page is an equity: parsed but skipped.
        pages.insert(
            format!("{}/listing/securities/BO2/", settings.base_url),
            card_page("Акции обыкновенные", "RU000A0TEST2"),
        );

        let mut fetcher = MapFetcher { listing, pages };
        let field_map = FieldMap::default();
        let service = ReferenceDataService::new(&settings, &field_map);

        let result = service.run(&mut fetcher, 0).await.unwrap();

        assert_eq!(result.bonds.len(), 2);
        assert_eq!(result.bonds_parsed, 1);
        assert_eq!(result.details_skipped, 1);
        assert_eq!(result.details_failed, 0);

        let text = std::fs::read_to_string(result.output_path.unwrap()).unwrap();
        assert!(text.contains("BO1"));
        assert!(text.contains("RU000A0TEST1"));
        assert!(!text.contains("BO2"));
    }

    #[tokio::test]
    async fn test_failed_detail_pages_are_counted_not_fatal() {
        let settings = {
            let mut s = Settings::default();
            s.output_dir = tempfile::tempdir().unwrap().keep();
            s
        };
        let listing = serde_json::json!({
            "content": [{"srtsCode": "BO1", "sisinCode": "RU1", "fullName": "Acme",
                         "securityKind": "Облигации"}],
            "totalPages": 1,
            "totalElements": 1,
        })
        .to_string();

        // No card pages scripted: every detail fetch fails.
        let mut fetcher = MapFetcher {
            listing,
            pages: HashMap::new(),
        };
        let field_map = FieldMap::default();
        let service = ReferenceDataService::new(&settings, &field_map);

        let result = service.run(&mut fetcher, 0).await.unwrap();

        assert_eq!(result.details_failed, 1);
        assert_eq!(result.bonds_parsed, 0);
        // The CSV still exists, headers only.
        assert!(result.output_path.unwrap().exists());
    }
}
