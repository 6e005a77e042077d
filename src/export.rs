//! CSV export for reference data.
//!
//! Output is UTF-8 with a byte-order mark so spreadsheet tools pick up
//! the Cyrillic pass-through columns. Column order is fixed leading
//! columns, then mapped fields in dictionary declaration order, then
//! any unmapped fields sorted for reproducibility.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use crate::fields::{self, FieldMap};
use crate::models::BondDetail;

const BOM: &str = "\u{feff}";

const LEADING_COLUMNS: &[&str] = &[
    fields::FIELD_SECURITY_SYMBOL,
    fields::FIELD_ISIN,
    fields::FIELD_FULL_NAME_ISSUER,
];

/// Resolve the output column order for a set of records.
///
/// Only columns that actually occur in the data are emitted; candidates
/// keep their declared order and leftovers arrive sorted.
pub fn column_order(details: &[BondDetail], map: &FieldMap) -> Vec<String> {
    let present: BTreeSet<&str> = details
        .iter()
        .flat_map(|detail| detail.field_names())
        .collect();

    let mut candidates: Vec<&str> = LEADING_COLUMNS.to_vec();
    for name in map.english_names() {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }
    candidates.push(fields::FIELD_FIRST_PAYMENT_DATE);

    let mut columns: Vec<String> = candidates
        .iter()
        .filter(|name| present.contains(**name))
        .map(|name| name.to_string())
        .collect();

    // Pass-through fields the mapping does not know, sorted.
    for name in &present {
        if !candidates.contains(name) {
            columns.push(name.to_string());
        }
    }

    columns
}

/// Write the reference-data CSV. A run always produces a file, even
/// when no rows survived.
pub fn write_reference_csv(
    path: &Path,
    details: &[BondDetail],
    map: &FieldMap,
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let columns = column_order(details, map);

    let mut buf: Vec<u8> = Vec::new();
    buf.write_all(BOM.as_bytes())?;
    write_row(&mut buf, columns.iter().map(String::as_str))?;

    for detail in details {
        write_row(
            &mut buf,
            columns.iter().map(|col| detail.get(col).unwrap_or("")),
        )?;
    }

    std::fs::write(path, buf)
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV row with minimal quoting; embedded quotes are doubled.
fn write_row<'a, W: Write>(mut w: W, row: impl Iterator<Item = &'a str>) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{escaped}\"")?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}
