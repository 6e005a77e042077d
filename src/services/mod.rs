//! High-level acquisition services tying the crawl, extraction, and
//! output layers together.

pub mod prospectus;
pub mod reference_data;

pub use prospectus::{ProspectusResult, ProspectusService};
pub use reference_data::{ReferenceDataResult, ReferenceDataService};
