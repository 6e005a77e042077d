//! Prospectus document acquisition.
//!
//! Scans bond card pages for prospectus document links and downloads
//! them into a directory tree keyed by sanitized issuer name and ISIN.
//! A file whose target path already exists is skipped, so re-runs only
//! pick up what is new.

use std::path::PathBuf;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::models::BondSummary;
use crate::scrapers::{FetchPage, HttpClient};
use crate::utils::{normalize_text, sanitize_filename};

/// Link texts that mark a prospectus document.
const PROSPECTUS_KEYWORDS: &[&str] = &["резюме проспекта", "проспект ценных бумаг", "prospectus"];

/// Extensions treated as downloadable documents.
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".zip"];

/// Counters for the run summary.
#[derive(Debug, Default)]
pub struct ProspectusResult {
    pub bonds_scanned: usize,
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub failures: usize,
}

/// Downloads prospectus documents for a set of bonds.
pub struct ProspectusService<'a> {
    settings: &'a Settings,
}

impl<'a> ProspectusService<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Visit each bond's card page and download its prospectus files.
    ///
    /// Card pages go through the configured fetch strategy; the binary
    /// downloads always use the plain HTTP client.
    pub async fn run<F: FetchPage>(
        &self,
        fetcher: &mut F,
        client: &HttpClient,
        bonds: &[BondSummary],
    ) -> ProspectusResult {
        let mut result = ProspectusResult::default();

        info!("scanning {} bonds for prospectus documents", bonds.len());

        for bond in bonds {
            result.bonds_scanned += 1;

            let html = match fetcher.fetch_url(&bond.url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("card page for {} failed: {e}", bond.code);
                    result.failures += 1;
                    continue;
                }
            };

            let links = collect_document_links(&html, &self.settings.base_url);
            if links.is_empty() {
                debug!("no prospectus links for {}", bond.code);
                continue;
            }

            for link in links {
                let path = self.document_path(bond, &link);
                match client.download_to(&link, &path).await {
                    Ok(true) => {
                        info!("downloaded {}", path.display());
                        result.files_downloaded += 1;
                    }
                    Ok(false) => result.files_skipped += 1,
                    Err(e) => {
                        warn!("download {link} failed: {e}");
                        result.failures += 1;
                    }
                }
            }
        }

        info!(
            "prospectus run done: {} downloaded, {} already present, {} failures",
            result.files_downloaded, result.files_skipped, result.failures
        );
        result
    }

    /// Target path: Prospectuses/<issuer>/<ISIN>/<basename>. Falls back
    /// to the trading code when the listing had no ISIN.
    fn document_path(&self, bond: &BondSummary, link: &str) -> PathBuf {
        let issuer = sanitize_filename(&bond.issuer_name);
        let isin = if bond.isin.is_empty() {
            sanitize_filename(&bond.code)
        } else {
            sanitize_filename(&bond.isin)
        };

        self.settings
            .prospectuses_dir()
            .join(issuer)
            .join(isin)
            .join(document_basename(link))
    }
}

/// Collect absolute document URLs from a card page: links whose target
/// has a document extension, or whose text names a prospectus.
pub(crate) fn collect_document_links(html: &str, base_url: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").unwrap();

    let mut links = Vec::new();
    for anchor in doc.select(&link_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let text = normalize_text(&anchor.text().collect::<String>()).to_lowercase();
        let href_lower = href.to_lowercase();

        let is_document = DOCUMENT_EXTENSIONS
            .iter()
            .any(|ext| href_lower.ends_with(ext));
        let is_prospectus = PROSPECTUS_KEYWORDS.iter().any(|kw| text.contains(kw));

        if !is_document && !is_prospectus {
            continue;
        }

        if let Some(absolute) = resolve_link(base_url, href) {
            if !links.contains(&absolute) {
                links.push(absolute);
            }
        }
    }
    links
}

fn resolve_link(base_url: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base_url)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}

/// Filename from the URL path; a slashless or empty path gets a
/// placeholder name.
fn document_basename(link: &str) -> String {
    let name = Url::parse(link)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .unwrap_or_default();

    if name.is_empty() {
        "document.pdf".to_string()
    } else {
        sanitize_filename(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://spbexchange.ru";

    #[test]
    fn test_collect_links_by_extension_and_keyword() {
        let html = r#"<html><body>
            <a href="/files/summary.pdf">Резюме проспекта ценных бумаг</a>
            <a href="/files/archive.ZIP">Архив</a>
            <a href="/listing/securities/OTHER/">Другая бумага</a>
            <a href="/pages/about">Проспект ценных бумаг</a>
        </body></html>"#;

        let links = collect_document_links(html, BASE);
        assert_eq!(
            links,
            vec![
                "https://spbexchange.ru/files/summary.pdf",
                "https://spbexchange.ru/files/archive.ZIP",
                "https://spbexchange.ru/pages/about",
            ]
        );
    }

    #[test]
    fn test_collect_links_deduplicates_and_keeps_absolute() {
        let html = r#"<html><body>
            <a href="https://cdn.example.org/p.pdf">Документ</a>
            <a href="https://cdn.example.org/p.pdf">Документ (копия)</a>
        </body></html>"#;

        let links = collect_document_links(html, BASE);
        assert_eq!(links, vec!["https://cdn.example.org/p.pdf"]);
    }

    #[test]
    fn test_document_path_is_keyed_by_issuer_and_isin() {
        let settings = Settings::default();
        let service = ProspectusService::new(&settings);
        let bond = BondSummary {
            code: "BO1".to_string(),
            isin: "RU000A0TEST1".to_string(),
            issuer_name: "ООО \"Ромашка\"".to_string(),
            url: String::new(),
        };

        let path = service.document_path(&bond, "https://spbexchange.ru/files/summary.pdf");
        assert_eq!(
            path,
            PathBuf::from("output/Prospectuses/ООО _Ромашка_/RU000A0TEST1/summary.pdf")
        );
    }

    #[test]
    fn test_document_path_falls_back_to_code_without_isin() {
        let settings = Settings::default();
        let service = ProspectusService::new(&settings);
        let bond = BondSummary {
            code: "BO1".to_string(),
            isin: String::new(),
            issuer_name: "Acme".to_string(),
            url: String::new(),
        };

        let path = service.document_path(&bond, "https://spbexchange.ru/files/x.pdf");
        assert_eq!(path, PathBuf::from("output/Prospectuses/Acme/BO1/x.pdf"));
    }

    #[test]
    fn test_document_basename_placeholder_for_bare_host() {
        assert_eq!(document_basename("https://example.org/"), "document.pdf");
        assert_eq!(document_basename("https://example.org/a/b.pdf"), "b.pdf");
    }
}
