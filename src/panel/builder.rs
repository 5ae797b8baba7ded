// src/panel/builder.rs

use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

use crate::error::PanelError;
use crate::panel::source::{FillPolicy, PanelSource};
use crate::panel::table::{Column, Panel};
use crate::schema::types::{
    BirthRecord, Municipality, MortalityRecord, PopulationRecord, PriceIndexRecord,
    SpendingRecord,
};

/// Outcome of one left-join, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinStats {
    /// Panel rows that found a source row.
    pub matched_rows: usize,
    /// Panel rows filled according to the source's [`FillPolicy`].
    pub filled_rows: usize,
    /// Source rows whose key is not in the panel.
    pub unused_source_rows: usize,
}

/// All source tables feeding one consolidation run.
#[derive(Debug, Default, Clone)]
pub struct Sources {
    pub mortality: Vec<MortalityRecord>,
    pub births: Vec<BirthRecord>,
    pub spending: Vec<SpendingRecord>,
    pub population: Vec<PopulationRecord>,
    pub price_index: Vec<PriceIndexRecord>,
}

impl Panel {
    /// Left-join `records` on the source's natural key.
    ///
    /// The panel keeps its row count. A source with two rows for one key is
    /// rejected with [`PanelError::DuplicateKey`] before anything is added.
    pub fn left_join<S: PanelSource>(&mut self, records: &[S]) -> Result<JoinStats, PanelError> {
        let mut by_key: HashMap<S::Key, usize> = HashMap::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let key = rec.key();
            if by_key.insert(key, i).is_some() {
                return Err(PanelError::DuplicateKey {
                    source_name: S::NAME,
                    key: format!("{:?}", key),
                });
            }
        }
        for name in S::COLUMNS {
            if self.column(name).is_some() {
                return Err(PanelError::DuplicateColumn(name.to_string()));
            }
        }

        let fill = match S::FILL {
            FillPolicy::Zero => Some(0.0),
            FillPolicy::Missing => None,
        };
        let mut cells: Vec<Vec<Option<f64>>> =
            vec![Vec::with_capacity(self.len()); S::COLUMNS.len()];
        let mut used = HashSet::with_capacity(records.len());
        let mut matched_rows = 0;

        for (m, year) in self.rows() {
            match by_key.get(&S::panel_key(m.code, year)) {
                Some(&i) => {
                    let values = records[i].values();
                    debug_assert_eq!(values.len(), S::COLUMNS.len());
                    for (col, v) in cells.iter_mut().zip(values) {
                        col.push(Some(v));
                    }
                    used.insert(i);
                    matched_rows += 1;
                }
                None => {
                    for col in cells.iter_mut() {
                        col.push(fill);
                    }
                }
            }
        }

        for (name, values) in S::COLUMNS.iter().zip(cells) {
            self.push_column(Column::new(*name, S::TYPE, values))?;
        }

        let stats = JoinStats {
            matched_rows,
            filled_rows: self.len() - matched_rows,
            unused_source_rows: records.len() - used.len(),
        };
        debug!(source = S::NAME, ?stats, "joined");
        Ok(stats)
    }
}

/// Build the balanced panel and join every source onto it, in order:
/// mortality, births, spending, population, price index.
#[instrument(level = "info", skip_all, fields(municipalities = municipalities.len()))]
pub fn build_panel(
    municipalities: Vec<Municipality>,
    start_year: i32,
    end_year: i32,
    sources: &Sources,
) -> Result<Panel, PanelError> {
    let mut panel = Panel::balanced(municipalities, start_year, end_year)?;
    info!(rows = panel.len(), years = panel.n_years(), "balanced panel");

    let joins = [
        (MortalityRecord::NAME, panel.left_join(&sources.mortality)?),
        (BirthRecord::NAME, panel.left_join(&sources.births)?),
        (SpendingRecord::NAME, panel.left_join(&sources.spending)?),
        (PopulationRecord::NAME, panel.left_join(&sources.population)?),
        (PriceIndexRecord::NAME, panel.left_join(&sources.price_index)?),
    ];
    for (name, stats) in joins {
        info!(
            source = name,
            matched = stats.matched_rows,
            filled = stats.filled_rows,
            unused = stats.unused_source_rows,
            "merged source"
        );
    }
    Ok(panel)
}
