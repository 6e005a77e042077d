//! Bond listing and detail models.

use std::collections::BTreeMap;

use serde_json::Value;

/// One page of listing results plus pagination metadata, as embedded by
/// the site framework.
///
/// The payload shape has changed before; all fields decode with
/// permissive defaults so callers tolerate missing keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRecord {
    /// Ordered item objects with heterogeneous fields keyed by the
    /// site's internal naming.
    pub content: Vec<Value>,
    /// 0-based exclusive upper bound on page numbers.
    pub total_pages: u32,
    /// Total item count across all pages.
    pub total_elements: u64,
    /// 0-based index of this page.
    pub page_number: u32,
}

impl PageRecord {
    /// Build a record from a decoded JSON object.
    pub fn from_value(value: &Value) -> Self {
        let content = value
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total_pages = value
            .get("totalPages")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        let total_elements = value
            .get("totalElements")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let page_number = value
            .get("pageNumber")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        Self {
            content,
            total_pages,
            total_elements,
            page_number,
        }
    }
}

/// Minimal per-bond info collected from the listing, used to drive the
/// detail-page phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondSummary {
    /// Exchange trading code. Non-empty and unique within a crawl run.
    pub code: String,
    pub isin: String,
    pub issuer_name: String,
    /// Detail (card) page URL.
    pub url: String,
}

/// Canonical English field name -> extracted value for one bond.
///
/// Fields listed in the mapping but absent from the page are present
/// with an empty value, so CSV rows stay rectangular.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondDetail {
    values: BTreeMap<String, String>,
}

impl BondDetail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_record_from_full_value() {
        let value = json!({
            "content": [{"srtsCode": "BO1"}],
            "totalPages": 5,
            "totalElements": 412,
            "pageNumber": 2
        });
        let record = PageRecord::from_value(&value);
        assert_eq!(record.content.len(), 1);
        assert_eq!(record.total_pages, 5);
        assert_eq!(record.total_elements, 412);
        assert_eq!(record.page_number, 2);
    }

    #[test]
    fn test_page_record_defaults_for_missing_keys() {
        let record = PageRecord::from_value(&json!({}));
        assert!(record.content.is_empty());
        assert_eq!(record.total_pages, 0);
        assert_eq!(record.total_elements, 0);
        assert_eq!(record.page_number, 0);
    }

    #[test]
    fn test_bond_detail_missing_field_is_absent_until_set() {
        let mut detail = BondDetail::new();
        assert!(!detail.contains("ISIN"));
        detail.set("ISIN", "");
        assert!(detail.contains("ISIN"));
        assert_eq!(detail.get("ISIN"), Some(""));
    }
}
