//! End-to-end test of the extraction pipeline against a rendered-page
//! fixture: locate the framework payload, reassemble it, find the page
//! object, decode it, and export the mapped details as CSV.

use bondacquire::detail::parse_bond_detail;
use bondacquire::export::write_reference_csv;
use bondacquire::extract::{bond_summaries, extract_page_record};
use bondacquire::fields::{FieldMap, FIELD_SECURITY_SYMBOL};

/// A listing page the way the site actually ships it: the payload is
/// split across several push-calls with quotes escaped for the script
/// string.
fn rendered_listing_page() -> String {
    let payload = serde_json::json!({
        "pageData": {
            "content": [
                {"idSecurities": 12345, "srtsCode": "TEST001",
                 "sisinCode": "RU000TEST001", "fullName": "Test Issuer Corp",
                 "securityKind": "Облигации"},
                {"idSecurities": 67890, "srtsCode": "TEST002",
                 "sisinCode": "RU000TEST002", "fullName": "Another Issuer LLC",
                 "securityKind": "Облигации"},
                {"idSecurities": 11111, "srtsCode": "EQ0001",
                 "sisinCode": "RU000EQUITY1", "fullName": "Equity Plc",
                 "securityKind": "Акции"},
            ],
            "totalPages": 1,
            "totalElements": 3,
        },
        "params": {}
    })
    .to_string();

    let escaped = payload.replace('\\', "\\\\").replace('"', "\\\"");
    let mid = escaped
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= escaped.len() / 2)
        .unwrap();
    let (head, tail) = escaped.split_at(mid);

    format!(
        "<!DOCTYPE html><html><head><title>Список ценных бумаг</title></head><body>\
         <div id=\"__next\"></div>\
         <script>self.__next_f.push([1,\"5:[\\\"$\\\",\\\"$L18\\\",null,{{\\\"children\\\":[]}}]\"])</script>\
         <script>self.__next_f.push([1,\"{head}\"])</script>\
         <script>self.__next_f.push([1,\"{tail}\"])</script>\
         </body></html>"
    )
}

fn card_page() -> &'static str {
    r#"<html><body><ul>
      <li class="SecuritiesField_item__7TKJg">
        <h3 class="SecuritiesField_itemTitle__7dfHY"><div>Вид, категория (тип) ценной бумаги</div></h3>
        <div class="SecuritiesField_itemDesc__JZ7w7">Облигации иностранного эмитента</div>
      </li>
      <li class="SecuritiesField_item__7TKJg">
        <h3 class="SecuritiesField_itemTitle__7dfHY"><div>ISIN код</div></h3>
        <div class="SecuritiesField_itemDesc__JZ7w7">RU000TEST001</div>
      </li>
      <li class="SecuritiesField_item__7TKJg">
        <h3 class="SecuritiesField_itemTitle__7dfHY"><div>Порядок выплаты процентов</div></h3>
        <div class="SecuritiesField_itemDesc__JZ7w7">Один раз в полугодие в конце полугодия</div>
      </li>
      <li class="SecuritiesField_item__7TKJg">
        <h3 class="SecuritiesField_itemTitle__7dfHY"><div>Даты выплаты процентов</div></h3>
        <div class="SecuritiesField_itemDesc__JZ7w7">15 марта и 15 сентября, начиная с 15 марта 2024 года</div>
      </li>
    </ul></body></html>"#
}

#[test]
fn listing_page_to_summaries() {
    let html = rendered_listing_page();
    let record = extract_page_record(&html).expect("fixture page must decode");

    assert_eq!(record.total_pages, 1);
    assert_eq!(record.total_elements, 3);
    assert_eq!(record.content.len(), 3);

    let bonds = bond_summaries(&record, "https://spbexchange.ru", "Облигац");
    let codes: Vec<_> = bonds.iter().map(|b| b.code.as_str()).collect();
    assert_eq!(codes, vec!["TEST001", "TEST002"]);
    assert_eq!(bonds[0].isin, "RU000TEST001");
    assert_eq!(
        bonds[0].url,
        "https://spbexchange.ru/listing/securities/TEST001/"
    );
}

#[test]
fn card_page_to_csv_row() {
    let map = FieldMap::default();
    let mut detail = parse_bond_detail(card_page(), &map)
        .expect("card page has fields")
        .expect("card page is a bond");
    detail.set(FIELD_SECURITY_SYMBOL, "TEST001");

    assert_eq!(detail.get("ISIN"), Some("RU000TEST001"));
    assert_eq!(detail.get("Coupon Frequency"), Some("2"));
    assert_eq!(detail.get("Interest Payment Dates"), Some("[03/15 ; 09/15]"));
    assert_eq!(detail.get("First Payment Date"), Some("03/15/2024"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reference.csv");
    write_reference_csv(&path, &[detail], &map).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with('\u{feff}'));

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("\u{feff}Security Symbol,ISIN"));
    assert!(lines[1].contains("TEST001"));
    assert!(lines[1].contains("[03/15 ; 09/15]"));
}
