// src/fetch/mod.rs
//! TabNet scraping: per-measure form bodies and the throttled, retrying
//! POST loop that collects one page per (measure, year).

pub mod forms;
pub mod tabnet;

pub use forms::Measure;
pub use tabnet::{build_client, fetch_pages, Page};
