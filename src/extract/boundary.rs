//! JSON boundary finder.
//!
//! The reassembled blob is not a clean JSON document: the page object is
//! buried between framework routing structures. Three strategies locate
//! it, ordered fastest-and-most-specific first; the first match wins and
//! later strategies run only when earlier ones miss.

use regex::Regex;

use crate::error::ScrapeError;

/// Locate the substring of `blob` that is a syntactically complete JSON
/// object describing one page of results.
pub fn find_page_json(blob: &str) -> Result<&str, ScrapeError> {
    if let Some(found) = anchored_page_data(blob) {
        return Ok(found);
    }
    if let Some(found) = content_with_pagination(blob) {
        return Ok(found);
    }
    if let Some(found) = brace_depth_match(blob) {
        return Ok(found);
    }

    Err(ScrapeError::NotFound(diagnose(blob)))
}

/// Strategy 1: the page object sits under a `"pageData"` key with a
/// `"params"` sibling immediately after its closing brace. Pattern-based
/// rather than brace-counted, so an inner string containing the anchor
/// would fool it; kept first because it is the fastest and most specific
/// match for the shape the site actually ships.
fn anchored_page_data(blob: &str) -> Option<&str> {
    let anchored = Regex::new(r#"(?s)"pageData":(\{.*?\}),"params""#).unwrap();
    anchored
        .captures(blob)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Strategy 2: no wrapper key; match an object carrying a `content`
/// array alongside the pagination counters.
fn content_with_pagination(blob: &str) -> Option<&str> {
    let shaped = Regex::new(
        r#"(?s)\{"content":\[.*?\]\s*,\s*"totalPages"\s*:\s*\d+\s*,\s*"totalElements"\s*:\s*\d+[^{}]*\}"#,
    )
    .unwrap();
    shaped.find(blob).map(|m| m.as_str())
}

/// Strategy 3: locate the `"content"` key, walk backward to the nearest
/// unmatched opening brace, then scan forward counting brace depth until
/// it returns to zero. Delimits the smallest enclosing object regardless
/// of key structure; the most robust and the most expensive, so it runs
/// last.
fn brace_depth_match(blob: &str) -> Option<&str> {
    let key_pos = blob.find("\"content\"")?;
    let bytes = blob.as_bytes();

    let mut depth = 0u32;
    let mut start = None;
    for i in (0..key_pos).rev() {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    let start = start?;

    // Forward scan must be string-aware: item values may contain braces.
    let mut depth = 0u32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in blob.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else {
                match byte {
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&blob[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Report which structural markers were present, to aid diagnosis when
/// every strategy misses.
fn diagnose(blob: &str) -> String {
    let mut seen = Vec::new();
    for marker in ["\"pageData\"", "\"content\"", "\"params\"", "\"totalPages\""] {
        if blob.contains(marker) {
            seen.push(marker);
        }
    }
    if seen.is_empty() {
        "no structural markers present in payload".to_string()
    } else {
        format!(
            "markers {} present but no enclosing page object found",
            seen.join(", ")
        )
    }
}
