use thiserror::Error;

/// Domain failures of the pipeline. I/O and network errors travel as
/// `anyhow::Error` with context instead.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("municipality reference list is empty")]
    EmptyMunicipalities,

    #[error("duplicate municipality code {0} in reference list")]
    DuplicateMunicipality(u32),

    #[error("invalid year range {start}..={end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("source `{source_name}` has more than one row for key {key}")]
    DuplicateKey { source_name: &'static str, key: String },

    #[error("column `{0}` already exists in the panel")]
    DuplicateColumn(String),

    #[error("column `{name}` has {found} cells, panel has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("column `{0}` not found in the panel")]
    MissingColumn(String),

    #[error("{measure} {year}: no table matched `{selector}`")]
    TableNotFound {
        measure: &'static str,
        year: i32,
        selector: String,
    },

    #[error("{measure} {year}: expected headers {expected:?}, got {found:?}")]
    TableHeader {
        measure: &'static str,
        year: i32,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{measure} {year}: row {row} has {found} cells, expected {expected}")]
    TableShape {
        measure: &'static str,
        year: i32,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),
}
