//! Text normalization helpers.

/// Collapse runs of whitespace (including newlines) into single spaces
/// and trim the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maximum length of a sanitized path component.
const MAX_COMPONENT_LEN: usize = 200;

/// Sanitize a string for use as a file or directory name.
///
/// Replaces characters that are invalid on common filesystems, collapses
/// whitespace and repeated underscores, trims trailing dots/spaces, and
/// caps the length.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();

    let collapsed = replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let trimmed = collapsed.trim_matches(|c| c == '.' || c == ' ');

    if trimmed.chars().count() > MAX_COMPONENT_LEN {
        trimmed.chars().take(MAX_COMPONENT_LEN).collect()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  a\n b\t\tc  "), "a b c");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("уже нормально"), "уже нормально");
    }

    #[test]
    fn test_sanitize_filename_invalid_chars() {
        assert_eq!(sanitize_filename("ПАО \"Газпром\""), "ПАО _Газпром_");
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
    }

    #[test]
    fn test_sanitize_filename_collapses_and_trims() {
        assert_eq!(sanitize_filename("a   b"), "a b");
        assert_eq!(sanitize_filename("a___b"), "a_b");
        assert_eq!(sanitize_filename("name. "), "name");
    }

    #[test]
    fn test_sanitize_filename_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_filename(&long).chars().count(), 200);
    }
}
