//! Detail-page field extraction.
//!
//! A bond card page renders its attributes as a labeled field list.
//! Extraction tries the site's own markup first, then falls back to
//! generic definition-list and table-row shapes, since the card layout
//! has been reshuffled before.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ScrapeError;
use crate::fields::{self, FieldMap};
use crate::models::BondDetail;
use crate::utils::normalize_text;

/// The site's field-list markup. Class names carry build hashes, so
/// selectors match on the stable prefix.
const FIELD_ITEM_SELECTOR: &str = r#"li[class*="SecuritiesField_item"]"#;
const FIELD_TITLE_SELECTOR: &str = r#"h3[class*="SecuritiesField_itemTitle"]"#;
const FIELD_DESC_SELECTOR: &str = r#"div[class*="SecuritiesField_itemDesc"]"#;

/// Parse one bond card page into a `BondDetail`.
///
/// Returns `Ok(None)` when the page is not a bond (the listing filter
/// has let non-bonds through before). Fails with `FieldExtraction` only
/// when the page has no recognizable field structure at all; individual
/// missing fields are recorded as empty strings.
pub fn parse_bond_detail(html_text: &str, map: &FieldMap) -> Result<Option<BondDetail>, ScrapeError> {
    let doc = Html::parse_document(html_text);
    let pairs = collect_field_pairs(&doc);

    if pairs.is_empty() {
        return Err(ScrapeError::FieldExtraction(
            "no labeled fields found on page".to_string(),
        ));
    }

    if !is_bond_page(&doc, &pairs, map) {
        debug!("skipping non-bond security page");
        return Ok(None);
    }

    let mut detail = BondDetail::new();

    for entry in &map.fields {
        let value = lookup_pair(&pairs, &entry.label).unwrap_or_default();

        if entry.name == fields::FIELD_COUPON_FREQUENCY {
            detail.set(entry.name.clone(), map.parse_coupon_frequency(&value));
        } else if entry.name == fields::FIELD_INTEREST_PAYMENT_DATES {
            let (dates, first) = fields::parse_interest_payment_dates(&value);
            detail.set(entry.name.clone(), dates);
            detail.set(fields::FIELD_FIRST_PAYMENT_DATE, first);
        } else if map.is_boolean_field(&entry.name) {
            detail.set(entry.name.clone(), map.parse_boolean(&value));
        } else {
            detail.set(entry.name.clone(), value);
        }
    }

    // Labels outside the mapping pass through under their original name.
    for (label, value) in &pairs {
        if map.lookup(label).is_none() {
            detail.set(label.clone(), value.clone());
        }
    }

    Ok(Some(detail))
}

/// Collect label -> value pairs, site markup first, generic fallbacks
/// second.
fn collect_field_pairs(doc: &Html) -> Vec<(String, String)> {
    let mut pairs = site_field_pairs(doc);
    if pairs.is_empty() {
        pairs = definition_list_pairs(doc);
    }
    if pairs.is_empty() {
        pairs = table_row_pairs(doc);
    }
    pairs
}

fn site_field_pairs(doc: &Html) -> Vec<(String, String)> {
    let item_sel = Selector::parse(FIELD_ITEM_SELECTOR).unwrap();
    let title_sel = Selector::parse(FIELD_TITLE_SELECTOR).unwrap();
    let desc_sel = Selector::parse(FIELD_DESC_SELECTOR).unwrap();

    let mut pairs = Vec::new();
    for item in doc.select(&item_sel) {
        let Some(title) = item.select(&title_sel).next() else {
            continue;
        };
        let label = clean_label(&element_text(title));
        if label.is_empty() {
            continue;
        }

        let value = item
            .select(&desc_sel)
            .next()
            .map(|desc| value_text(desc))
            .unwrap_or_default();

        pairs.push((label, value));
    }
    pairs
}

/// dt/dd definition lists.
fn definition_list_pairs(doc: &Html) -> Vec<(String, String)> {
    let dt_sel = Selector::parse("dt").unwrap();

    let mut pairs = Vec::new();
    for dt in doc.select(&dt_sel) {
        let Some(dd) = next_element_named(dt, "dd") else {
            continue;
        };
        let label = clean_label(&element_text(dt));
        if !label.is_empty() {
            pairs.push((label, value_text(dd)));
        }
    }
    pairs
}

/// Two-column table rows.
fn table_row_pairs(doc: &Html) -> Vec<(String, String)> {
    let tr_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td, th").unwrap();

    let mut pairs = Vec::new();
    for row in doc.select(&tr_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() >= 2 {
            let label = clean_label(&element_text(cells[0]));
            if !label.is_empty() {
                pairs.push((label, value_text(cells[1])));
            }
        }
    }
    pairs
}

/// Whether the page actually describes a bond. The security-category
/// field decides when present; otherwise the page text must at least
/// mention bonds.
fn is_bond_page(doc: &Html, pairs: &[(String, String)], map: &FieldMap) -> bool {
    let category_label = map
        .fields
        .iter()
        .find(|entry| entry.name == fields::FIELD_SECURITY_CATEGORY)
        .map(|entry| entry.label.as_str());

    if let Some(label) = category_label {
        if let Some(category) = lookup_pair(pairs, label) {
            let lower = category.to_lowercase();
            return lower.contains("облигац") || lower.contains("bond");
        }
    }

    let text = doc.root_element().text().collect::<String>().to_lowercase();
    text.contains("облигац") || text.contains("bond")
}

fn lookup_pair(pairs: &[(String, String)], label: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(l, _)| l == label)
        .map(|(_, v)| v.clone())
}

/// Strip footnote references ("Лот [1]" -> "Лот") and normalize
/// whitespace.
fn clean_label(raw: &str) -> String {
    let base = raw.split('[').next().unwrap_or(raw);
    normalize_text(base)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Cell value: links become their targets joined with " | ", since
/// document URLs matter more than anchor text; plain cells are
/// normalized text.
fn value_text(element: ElementRef<'_>) -> String {
    let link_sel = Selector::parse("a[href]").unwrap();
    let links: Vec<String> = element
        .select(&link_sel)
        .map(|a| {
            a.value()
                .attr("href")
                .map(str::to_string)
                .unwrap_or_else(|| normalize_text(&element_text(a)))
        })
        .collect();

    if links.is_empty() {
        normalize_text(&element_text(element))
    } else {
        links.join(" | ")
    }
}

fn next_element_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    let mut sibling = element.next_sibling();
    while let Some(node) = sibling {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == name {
                return Some(el);
            }
            return None;
        }
        sibling = node.next_sibling();
    }
    None
}
