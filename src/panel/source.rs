// src/panel/source.rs

use std::fmt::Debug;
use std::hash::Hash;

use crate::panel::table::ColumnType;
use crate::schema::types::{
    BirthRecord, MortalityRecord, PopulationRecord, PriceIndexRecord, SpendingRecord,
    MORTALITY_COLUMNS,
};

/// What an unmatched panel row gets in a joined column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Absence from the source means zero occurrences.
    Zero,
    /// Absence from the source means the value is unknown.
    Missing,
}

/// A tidy source table that can be left-joined onto the panel.
pub trait PanelSource {
    type Key: Eq + Hash + Copy + Debug;

    const NAME: &'static str;
    const FILL: FillPolicy;
    const TYPE: ColumnType;
    /// Columns introduced by the join, aligned with [`PanelSource::values`].
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> Self::Key;
    /// Key a panel row looks up in this source.
    fn panel_key(mun_code: u32, year: i32) -> Self::Key;
    fn values(&self) -> Vec<f64>;
}

impl PanelSource for MortalityRecord {
    type Key = (u32, i32);
    const NAME: &'static str = "mortality";
    const FILL: FillPolicy = FillPolicy::Zero;
    const TYPE: ColumnType = ColumnType::Int;
    const COLUMNS: &'static [&'static str] = &MORTALITY_COLUMNS;

    fn key(&self) -> Self::Key {
        (self.mun_code, self.year)
    }
    fn panel_key(mun_code: u32, year: i32) -> Self::Key {
        (mun_code, year)
    }
    fn values(&self) -> Vec<f64> {
        self.counts().iter().map(|&c| c as f64).collect()
    }
}

impl PanelSource for BirthRecord {
    type Key = (u32, i32);
    const NAME: &'static str = "births";
    const FILL: FillPolicy = FillPolicy::Zero;
    const TYPE: ColumnType = ColumnType::Int;
    const COLUMNS: &'static [&'static str] = &["births"];

    fn key(&self) -> Self::Key {
        (self.mun_code, self.year)
    }
    fn panel_key(mun_code: u32, year: i32) -> Self::Key {
        (mun_code, year)
    }
    fn values(&self) -> Vec<f64> {
        vec![self.births as f64]
    }
}

impl PanelSource for SpendingRecord {
    type Key = (u32, i32);
    const NAME: &'static str = "spending";
    const FILL: FillPolicy = FillPolicy::Missing;
    const TYPE: ColumnType = ColumnType::Float;
    const COLUMNS: &'static [&'static str] = &["pc_spend"];

    fn key(&self) -> Self::Key {
        (self.mun_code, self.year)
    }
    fn panel_key(mun_code: u32, year: i32) -> Self::Key {
        (mun_code, year)
    }
    fn values(&self) -> Vec<f64> {
        vec![self.pc_spend]
    }
}

impl PanelSource for PopulationRecord {
    type Key = (u32, i32);
    const NAME: &'static str = "population";
    const FILL: FillPolicy = FillPolicy::Missing;
    const TYPE: ColumnType = ColumnType::Int;
    const COLUMNS: &'static [&'static str] = &["pop"];

    fn key(&self) -> Self::Key {
        (self.mun_code, self.year)
    }
    fn panel_key(mun_code: u32, year: i32) -> Self::Key {
        (mun_code, year)
    }
    fn values(&self) -> Vec<f64> {
        vec![self.pop as f64]
    }
}

impl PanelSource for PriceIndexRecord {
    type Key = i32;
    const NAME: &'static str = "price_index";
    const FILL: FillPolicy = FillPolicy::Missing;
    const TYPE: ColumnType = ColumnType::Float;
    const COLUMNS: &'static [&'static str] = &["index"];

    fn key(&self) -> Self::Key {
        self.year
    }
    fn panel_key(_mun_code: u32, year: i32) -> Self::Key {
        year
    }
    fn values(&self) -> Vec<f64> {
        vec![self.index]
    }
}
