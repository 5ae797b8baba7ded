pub mod arrow;
pub mod store;
pub mod types;

pub use arrow::{final_schema, panel_to_batch, write_csv, write_parquet};
pub use store::{read_records, write_json, write_records};
pub use types::{
    BirthRecord, Municipality, MortalityRecord, PopulationRecord, PriceIndexRecord, Region,
    SpendingRecord, MORTALITY_COLUMNS,
};
