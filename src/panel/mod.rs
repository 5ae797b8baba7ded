// src/panel/mod.rs
//! Balanced municipality × year panel: scaffold, source joins, derived
//! rates and the plot-ready summaries.

pub mod builder;
pub mod rates;
pub mod source;
pub mod summary;
pub mod table;

pub use builder::{build_panel, JoinStats, Sources};
pub use source::{FillPolicy, PanelSource};
pub use table::{Column, ColumnType, Panel};
