//! Payload locator and fragment reassembler.

use regex::Regex;

/// Marker pattern for the framework's streaming push-calls. The capture
/// may span newlines since the server sometimes wraps script output.
const PUSH_CALL_PATTERN: &str = r#"(?s)self\.__next_f\.push\(\[1,"(.+?)"\]\)"#;

/// Sentinel protecting literal double-backslashes during unescaping.
/// NUL cannot appear in the serializer's output.
const SENTINEL: char = '\u{0}';

/// Scan raw HTML for all framework push-calls and return their quoted
/// string arguments in document order.
///
/// Zero matches means "not a recognized framework page", not a parse
/// failure, so the result is simply empty.
pub fn locate_fragments(html: &str) -> Vec<String> {
    let push_call = Regex::new(PUSH_CALL_PATTERN).unwrap();
    push_call
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Concatenate fragments in located order and reverse the serializer's
/// escaping. Document order corresponds to logical payload order for
/// this framework's output.
pub fn reassemble(fragments: &[String]) -> String {
    unescape_payload(&fragments.concat())
}

/// Reverse the script-string escaping applied by the framework.
///
/// Three passes: double backslashes are parked on a sentinel, remaining
/// single backslashes (escape markers for quotes) are removed, then the
/// sentinel is restored as a single backslash. This keeps literal
/// backslash sequences inside values intact, which a naive find/replace
/// would corrupt.
pub fn unescape_payload(raw: &str) -> String {
    raw.replace("\\\\", &SENTINEL.to_string())
        .replace('\\', "")
        .replace(SENTINEL, "\\")
}

/// Escape a payload the way the framework's serializer does: literal
/// backslashes doubled, quotes escaped with a single backslash. Used to
/// build synthetic fixtures for the extraction chain.
#[cfg(test)]
pub(crate) fn escape_like_framework(payload: &str) -> String {
    payload.replace('\\', "\\\\").replace('"', "\\\"")
}
