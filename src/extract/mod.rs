//! Extraction of the server-computed page model embedded in the site's
//! JavaScript-rendered HTML.
//!
//! The site ships one logical JSON payload split across repeated
//! framework push-calls, with quotes and backslashes escaped for the
//! enclosing script string. The chain here is: locate the fragments,
//! reassemble and unescape them, find the JSON object boundary for one
//! page of results, and decode it into a `PageRecord`.

pub mod boundary;
pub mod page;
pub mod payload;

pub use page::{bond_summaries, decode_page_record, extract_page_record};
pub use payload::{locate_fragments, reassemble, unescape_payload};
