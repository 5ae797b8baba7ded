// src/schema/types.rs

use serde::{Deserialize, Serialize};

use crate::process::icd::CauseCategory;

/// IBGE macro-region, keyed by the first digit of the state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    North,
    Northeast,
    Southeast,
    South,
    CentralWest,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::North,
        Region::Northeast,
        Region::Southeast,
        Region::South,
        Region::CentralWest,
    ];

    pub fn from_state_code(state_code: &str) -> Option<Self> {
        match state_code.trim().chars().next()? {
            '1' => Some(Region::North),
            '2' => Some(Region::Northeast),
            '3' => Some(Region::Southeast),
            '4' => Some(Region::South),
            '5' => Some(Region::CentralWest),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::North => "North",
            Region::Northeast => "Northeast",
            Region::Southeast => "Southeast",
            Region::South => "South",
            Region::CentralWest => "Central-West",
        }
    }
}

/// Reference municipality. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Municipality {
    pub code: u32,
    pub name: String,
    /// State abbreviation as given by the reference list.
    pub state: String,
    pub state_code: String,
    pub region: Option<Region>,
}

/// One death count row per (municipality, year). Field order is the CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortalityRecord {
    pub mun_code: u32,
    pub year: i32,
    pub im: u64,
    pub im_perinat: u64,
    pub im_cong: u64,
    pub im_illdef: u64,
    pub im_infec: u64,
    pub im_resp: u64,
    pub im_endoc: u64,
    pub im_exter: u64,
    pub im_nerv: u64,
    pub im_circ: u64,
    pub im_blood: u64,
    pub im_digest: u64,
    pub im_eye: u64,
    pub im_neop: u64,
    pub im_apc: u64,
    pub im_napc: u64,
}

/// Count columns of [`MortalityRecord`], in order.
pub const MORTALITY_COLUMNS: [&str; 16] = [
    "im",
    "im_perinat",
    "im_cong",
    "im_illdef",
    "im_infec",
    "im_resp",
    "im_endoc",
    "im_exter",
    "im_nerv",
    "im_circ",
    "im_blood",
    "im_digest",
    "im_eye",
    "im_neop",
    "im_apc",
    "im_napc",
];

impl MortalityRecord {
    pub fn new(mun_code: u32, year: i32) -> Self {
        Self {
            mun_code,
            year,
            ..Default::default()
        }
    }

    pub fn cause_mut(&mut self, cause: CauseCategory) -> &mut u64 {
        match cause {
            CauseCategory::Perinatal => &mut self.im_perinat,
            CauseCategory::Congenital => &mut self.im_cong,
            CauseCategory::IllDefined => &mut self.im_illdef,
            CauseCategory::Infectious => &mut self.im_infec,
            CauseCategory::Respiratory => &mut self.im_resp,
            CauseCategory::Endocrine => &mut self.im_endoc,
            CauseCategory::External => &mut self.im_exter,
            CauseCategory::Nervous => &mut self.im_nerv,
            CauseCategory::Circulatory => &mut self.im_circ,
            CauseCategory::Blood => &mut self.im_blood,
            CauseCategory::Digestive => &mut self.im_digest,
            CauseCategory::SensoryMusculoskeletalGenitourinary => &mut self.im_eye,
            CauseCategory::Neoplasm => &mut self.im_neop,
        }
    }

    /// Add another partial count for the same key into this one.
    pub fn merge(&mut self, other: &Self) {
        self.im += other.im;
        self.im_perinat += other.im_perinat;
        self.im_cong += other.im_cong;
        self.im_illdef += other.im_illdef;
        self.im_infec += other.im_infec;
        self.im_resp += other.im_resp;
        self.im_endoc += other.im_endoc;
        self.im_exter += other.im_exter;
        self.im_nerv += other.im_nerv;
        self.im_circ += other.im_circ;
        self.im_blood += other.im_blood;
        self.im_digest += other.im_digest;
        self.im_eye += other.im_eye;
        self.im_neop += other.im_neop;
        self.im_apc += other.im_apc;
        self.im_napc += other.im_napc;
    }

    /// Values aligned with [`MORTALITY_COLUMNS`].
    pub fn counts(&self) -> [u64; 16] {
        [
            self.im,
            self.im_perinat,
            self.im_cong,
            self.im_illdef,
            self.im_infec,
            self.im_resp,
            self.im_endoc,
            self.im_exter,
            self.im_nerv,
            self.im_circ,
            self.im_blood,
            self.im_digest,
            self.im_eye,
            self.im_neop,
            self.im_apc,
            self.im_napc,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthRecord {
    pub year: i32,
    pub mun_code: u32,
    pub births: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingRecord {
    pub year: i32,
    pub mun_code: u32,
    /// Nominal public health spending per capita, R$.
    pub pc_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub year: i32,
    pub mun_code: u32,
    pub pop: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceIndexRecord {
    pub year: i32,
    /// Price level relative to the terminal period (1.0).
    pub index: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_first_digit() {
        assert_eq!(Region::from_state_code("35"), Some(Region::Southeast));
        assert_eq!(Region::from_state_code("53"), Some(Region::CentralWest));
        assert_eq!(Region::from_state_code("11"), Some(Region::North));
        assert_eq!(Region::from_state_code("9"), None);
        assert_eq!(Region::from_state_code(""), None);
        assert_eq!(Region::CentralWest.label(), "Central-West");
    }

    #[test]
    fn cause_fields_line_up_with_columns() {
        for cause in CauseCategory::ALL {
            let mut rec = MortalityRecord::new(1, 2000);
            *rec.cause_mut(cause) += 1;
            let counts = rec.counts();
            let idx = MORTALITY_COLUMNS
                .iter()
                .position(|c| *c == cause.column())
                .unwrap();
            assert_eq!(counts[idx], 1, "{}", cause.column());
            assert_eq!(counts.iter().sum::<u64>(), 1);
        }
    }
}
