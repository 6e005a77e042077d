//! Shared utility functions.
//!
//! - `text`: whitespace normalization and filename sanitization

mod text;

pub use text::{normalize_text, sanitize_filename};
