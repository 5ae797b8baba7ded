// src/panel/summary.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use crate::process::icd::CauseCategory;
use crate::schema::types::Region;

/// Columns of the final panel the summaries read. Other columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PanelRow {
    pub mun_code: u32,
    pub year: i32,
    pub region: Option<String>,
    pub municipio: Option<String>,
    pub estado: Option<String>,
    pub births: Option<f64>,
    pub pop: Option<f64>,
    pub pc_spend_real: Option<f64>,
    pub im_rate: Option<f64>,
    pub im_perinat_rate: Option<f64>,
    pub im_cong_rate: Option<f64>,
    pub im_illdef_rate: Option<f64>,
    pub im_infec_rate: Option<f64>,
    pub im_resp_rate: Option<f64>,
}

impl PanelRow {
    fn region(&self) -> Option<&str> {
        self.region.as_deref().filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub year: i32,
    pub region: String,
    pub imr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseTrendRow {
    pub year: i32,
    pub cause: &'static str,
    pub imr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityShift {
    pub mun_code: u32,
    pub municipio: String,
    pub region: String,
    pub imr_start: f64,
    pub imr_shift: f64,
    pub pop_start: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateYear {
    pub estado: String,
    pub region: String,
    pub year: i32,
    pub imr: Option<f64>,
    pub pop: f64,
    pub pc_spend_real: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateShift {
    pub estado: String,
    pub region: String,
    pub imr_start: f64,
    pub imr_shift: f64,
    pub pop_start: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summaries {
    pub trends_region: Vec<TrendRow>,
    pub trends_cause: Vec<CauseTrendRow>,
    pub shifts_municipality: Vec<MunicipalityShift>,
    pub state_year: Vec<StateYear>,
    pub shifts_state: Vec<StateShift>,
}

/// Running `Σ value·weight / Σ weight`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedMean {
    sum: f64,
    weight: f64,
}

impl WeightedMean {
    pub fn add(&mut self, value: Option<f64>, weight: Option<f64>) {
        if let (Some(v), Some(w)) = (value, weight) {
            self.sum += v * w;
            self.weight += w;
        }
    }

    /// `None` when the accumulated weight is zero.
    pub fn value(&self) -> Option<f64> {
        if self.weight == 0.0 {
            None
        } else {
            Some(self.sum / self.weight)
        }
    }
}

pub const BRAZIL: &str = "Brazil";

type CauseRate = (CauseCategory, fn(&PanelRow) -> Option<f64>);

const MAIN_CAUSES: [CauseRate; 5] = [
    (CauseCategory::Perinatal, |r| r.im_perinat_rate),
    (CauseCategory::Congenital, |r| r.im_cong_rate),
    (CauseCategory::IllDefined, |r| r.im_illdef_rate),
    (CauseCategory::Infectious, |r| r.im_infec_rate),
    (CauseCategory::Respiratory, |r| r.im_resp_rate),
];

/// Birth-weighted infant mortality per year for Brazil, then per region.
pub fn trends_by_region(rows: &[PanelRow]) -> Vec<TrendRow> {
    let mut brazil: BTreeMap<i32, WeightedMean> = BTreeMap::new();
    let mut regional: BTreeMap<(i32, &str), WeightedMean> = BTreeMap::new();
    for r in rows {
        brazil.entry(r.year).or_default().add(r.im_rate, r.births);
        if let Some(region) = r.region() {
            regional.entry((r.year, region)).or_default().add(r.im_rate, r.births);
        }
    }

    let mut out = Vec::with_capacity(brazil.len() * (Region::ALL.len() + 1));
    for (&year, wm) in &brazil {
        out.push(TrendRow {
            year,
            region: BRAZIL.to_string(),
            imr: wm.value(),
        });
        for region in Region::ALL {
            if let Some(wm) = regional.get(&(year, region.label())) {
                out.push(TrendRow {
                    year,
                    region: region.label().to_string(),
                    imr: wm.value(),
                });
            }
        }
    }
    out
}

/// Birth-weighted national rate of the main causes of death, per year.
pub fn trends_by_cause(rows: &[PanelRow]) -> Vec<CauseTrendRow> {
    let mut by_year: BTreeMap<i32, [WeightedMean; 5]> = BTreeMap::new();
    for r in rows {
        let acc = by_year.entry(r.year).or_default();
        for (wm, (_, rate)) in acc.iter_mut().zip(MAIN_CAUSES.iter()) {
            wm.add(rate(r), r.births);
        }
    }
    let mut out = Vec::with_capacity(by_year.len() * MAIN_CAUSES.len());
    for (cause_idx, &(cause, _)) in MAIN_CAUSES.iter().enumerate() {
        for (&year, acc) in &by_year {
            out.push(CauseTrendRow {
                year,
                cause: cause.display_name(),
                imr: acc[cause_idx].value(),
            });
        }
    }
    out
}

/// Change in `im_rate` between the two years against its starting level.
/// Municipalities with any missing field are left out.
pub fn municipality_shifts(rows: &[PanelRow], start_year: i32, end_year: i32) -> Vec<MunicipalityShift> {
    let end_rates: BTreeMap<u32, Option<f64>> = rows
        .iter()
        .filter(|r| r.year == end_year)
        .map(|r| (r.mun_code, r.im_rate))
        .collect();

    let mut out: Vec<MunicipalityShift> = rows
        .iter()
        .filter(|r| r.year == start_year)
        .filter_map(|r| {
            let start = r.im_rate?;
            let end = (*end_rates.get(&r.mun_code)?)?;
            Some(MunicipalityShift {
                mun_code: r.mun_code,
                municipio: r.municipio.clone().filter(|m| !m.is_empty())?,
                region: r.region()?.to_string(),
                imr_start: start,
                imr_shift: end - start,
                pop_start: r.pop?,
            })
        })
        .collect();
    out.sort_by_key(|s| s.mun_code);
    out
}

#[derive(Default)]
struct StateAcc {
    imr: WeightedMean,
    spend: WeightedMean,
    pop: f64,
}

/// Per state and year over complete rows: birth-weighted rate and real
/// spending, summed population.
pub fn state_year(rows: &[PanelRow]) -> Vec<StateYear> {
    let mut groups: BTreeMap<(&str, i32, &str), StateAcc> = BTreeMap::new();
    for r in rows {
        let (Some(estado), Some(region), Some(pop), Some(_), Some(_), Some(_)) = (
            r.estado.as_deref().filter(|e| !e.is_empty()),
            r.region(),
            r.pop,
            r.pc_spend_real,
            r.im_rate,
            r.births,
        ) else {
            continue;
        };
        let acc = groups.entry((estado, r.year, region)).or_default();
        acc.imr.add(r.im_rate, r.births);
        acc.spend.add(r.pc_spend_real, r.births);
        acc.pop += pop;
    }
    groups
        .into_iter()
        .map(|((estado, year, region), acc)| StateYear {
            estado: estado.to_string(),
            region: region.to_string(),
            year,
            imr: acc.imr.value(),
            pop: acc.pop,
            pc_spend_real: acc.spend.value(),
        })
        .collect()
}

pub fn state_shifts(state_year: &[StateYear], start_year: i32, end_year: i32) -> Vec<StateShift> {
    let end: BTreeMap<(&str, &str), Option<f64>> = state_year
        .iter()
        .filter(|s| s.year == end_year)
        .map(|s| ((s.estado.as_str(), s.region.as_str()), s.imr))
        .collect();
    state_year
        .iter()
        .filter(|s| s.year == start_year)
        .filter_map(|s| {
            let start = s.imr?;
            let end = (*end.get(&(s.estado.as_str(), s.region.as_str()))?)?;
            Some(StateShift {
                estado: s.estado.clone(),
                region: s.region.clone(),
                imr_start: start,
                imr_shift: end - start,
                pop_start: s.pop,
            })
        })
        .collect()
}

#[instrument(level = "info", skip(rows), fields(rows = rows.len()))]
pub fn summarize(rows: &[PanelRow], start_year: i32, end_year: i32) -> Summaries {
    let state_year = state_year(rows);
    let summaries = Summaries {
        trends_region: trends_by_region(rows),
        trends_cause: trends_by_cause(rows),
        shifts_municipality: municipality_shifts(rows, start_year, end_year),
        shifts_state: state_shifts(&state_year, start_year, end_year),
        state_year,
    };
    info!(
        trends = summaries.trends_region.len(),
        municipalities = summaries.shifts_municipality.len(),
        state_years = summaries.state_year.len(),
        states = summaries.shifts_state.len(),
        "summaries computed"
    );
    summaries
}
