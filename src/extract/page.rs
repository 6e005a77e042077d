//! Page model decoder.

use serde_json::Value;
use tracing::warn;

use super::{boundary, payload};
use crate::error::ScrapeError;
use crate::models::{BondSummary, PageRecord};

/// Parse a boundary-found JSON string into a `PageRecord`.
///
/// Malformed JSON is a `Decode` error: fatal for the current page, not
/// for the crawl.
pub fn decode_page_record(json_text: &str) -> Result<PageRecord, ScrapeError> {
    let value: Value = serde_json::from_str(json_text)?;
    Ok(PageRecord::from_value(&value))
}

/// Decode one page of listing results from fetched text, whatever its
/// origin.
///
/// A direct API response is already bare JSON and short-circuits the
/// extraction chain; rendered HTML goes through locate -> reassemble ->
/// boundary-find -> decode.
pub fn extract_page_record(text: &str) -> Result<PageRecord, ScrapeError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if value.get("content").is_some() {
                return Ok(PageRecord::from_value(&value));
            }
        }
    }

    let fragments = payload::locate_fragments(text);
    if fragments.is_empty() {
        return Err(ScrapeError::NotFound(
            "no framework push-call markers in page".to_string(),
        ));
    }

    let blob = payload::reassemble(&fragments);
    let json_text = boundary::find_page_json(&blob)?;
    decode_page_record(json_text)
}

/// Derive `BondSummary` entries from a page's items.
///
/// Items are re-filtered by security kind even though the fetch already
/// requested that filter server-side, and items without a trading code
/// are dropped with a warning. Uniqueness across pages is the crawl
/// driver's concern.
pub fn bond_summaries(record: &PageRecord, base_url: &str, kind_stem: &str) -> Vec<BondSummary> {
    let mut bonds = Vec::new();

    for item in &record.content {
        let kind = item_str(item, "securityKind");
        if !kind.contains(kind_stem) {
            continue;
        }

        let code = item_str(item, "srtsCode");
        if code.is_empty() {
            warn!("listing item without security code: {item}");
            continue;
        }

        bonds.push(BondSummary {
            url: format!("{base_url}/listing/securities/{code}/"),
            code,
            isin: item_str(item, "sisinCode"),
            issuer_name: item_str(item, "fullName"),
        });
    }

    bonds
}

fn item_str(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}
