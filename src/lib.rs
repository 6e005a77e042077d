//! bondacquire - bond reference data and prospectus acquisition system.
//!
//! Crawls the SPB Exchange securities listing, extracts the page model
//! embedded in its JavaScript-rendered pages, normalizes Russian field
//! labels into an English schema, and persists results as CSV plus
//! downloaded prospectus documents.

pub mod cli;
pub mod config;
pub mod crawl;
pub mod detail;
pub mod error;
pub mod export;
pub mod extract;
pub mod fields;
pub mod models;
pub mod scrapers;
pub mod services;
pub mod utils;
