//! Data models for crawl results.

mod bond;

pub use bond::{BondDetail, BondSummary, PageRecord};
