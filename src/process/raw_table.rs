use serde::Serialize;

/// A table lifted out of an HTML page, cell text only.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Header labels, whitespace-normalized.
    pub headers: Vec<String>,
    /// Each data row, one String per cell, same width as `headers`.
    pub rows: Vec<Vec<String>>,
}

/// An input row that was dropped during extraction, kept for the validation report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    pub source: String,
    pub year: Option<i32>,
    pub label: String,
    pub reason: String,
}

impl RejectedRow {
    pub fn new(source: &str, year: Option<i32>, label: &str, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            year,
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}
