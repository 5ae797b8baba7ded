// src/process/mod.rs
//! Source extractors: turn raw inputs into tidy per-source tables.

pub mod html_table;
pub mod icd;
pub mod mortality;
pub mod municipality;
pub mod price_index;
pub mod raw_table;
pub mod tabnet;
pub mod utils;

pub use raw_table::{RawTable, RejectedRow};

/// Records an extractor kept, plus the input rows it dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Default for Extracted<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Extracted<T> {
    pub fn extend(&mut self, other: Extracted<T>) {
        self.records.extend(other.records);
        self.rejected.extend(other.rejected);
    }
}
