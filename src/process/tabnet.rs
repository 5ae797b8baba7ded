// src/process/tabnet.rs

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::fetch::forms::Measure;
use crate::process::html_table::parse_table;
use crate::process::utils::{parse_locale_count, parse_locale_number, split_municipality_label};
use crate::process::{Extracted, RawTable, RejectedRow};
use crate::schema::types::{BirthRecord, PopulationRecord, SpendingRecord};

/// Label of the leading grand-total row every TabNet table carries.
const TOTAL_LABEL: &str = "Total";

/// `(municipality code, value)` per data row. The total row is dropped
/// silently; every other row that cannot be read is reported.
pub fn municipality_values<T>(
    table: &RawTable,
    source: &'static str,
    year: i32,
    parse: impl Fn(&str) -> Option<T>,
) -> (Vec<(u32, T)>, Vec<RejectedRow>) {
    let mut values = Vec::with_capacity(table.rows.len());
    let mut rejected = Vec::new();
    for row in &table.rows {
        let (Some(label), Some(cell)) = (row.first(), row.get(1)) else {
            continue;
        };
        if label.eq_ignore_ascii_case(TOTAL_LABEL) {
            continue;
        }
        let Some((code, _name)) = split_municipality_label(label) else {
            rejected.push(RejectedRow::new(
                source,
                Some(year),
                label,
                "label does not start with a 6-digit municipality code",
            ));
            continue;
        };
        match parse(cell) {
            Some(v) => values.push((code, v)),
            None => rejected.push(RejectedRow::new(
                source,
                Some(year),
                label,
                format!("unparseable value `{}`", cell),
            )),
        }
    }
    (values, rejected)
}

pub fn births_from_table(table: &RawTable, year: i32) -> Extracted<BirthRecord> {
    let (values, rejected) = municipality_values(table, "births", year, parse_locale_count);
    Extracted {
        records: values
            .into_iter()
            .map(|(mun_code, births)| BirthRecord { year, mun_code, births })
            .collect(),
        rejected,
    }
}

pub fn spending_from_table(table: &RawTable, year: i32) -> Extracted<SpendingRecord> {
    let (values, rejected) = municipality_values(table, "spending", year, parse_locale_number);
    Extracted {
        records: values
            .into_iter()
            .map(|(mun_code, pc_spend)| SpendingRecord { year, mun_code, pc_spend })
            .collect(),
        rejected,
    }
}

pub fn population_from_table(table: &RawTable, year: i32) -> Extracted<PopulationRecord> {
    let (values, rejected) = municipality_values(table, "population", year, parse_locale_count);
    Extracted {
        records: values
            .into_iter()
            .map(|(mun_code, pop)| PopulationRecord { year, mun_code, pop })
            .collect(),
        rejected,
    }
}

/// Everything scraped from TabNet for one import run.
#[derive(Debug, Default)]
pub struct TabnetTables {
    pub births: Extracted<BirthRecord>,
    pub spending: Extracted<SpendingRecord>,
    pub population: Extracted<PopulationRecord>,
}

impl TabnetTables {
    /// Parse one fetched page and append its rows to the measure's table.
    pub fn add_page(&mut self, measure: Measure, year: i32, html: &str) -> Result<()> {
        let table = parse_table(html, measure.contract(), year)
            .with_context(|| format!("reading {} table for {}", measure.name(), year))?;
        let rejected = match measure {
            Measure::Births => {
                let out = births_from_table(&table, year);
                let n = out.rejected.len();
                self.births.extend(out);
                n
            }
            Measure::Spending => {
                let out = spending_from_table(&table, year);
                let n = out.rejected.len();
                self.spending.extend(out);
                n
            }
            Measure::Population => {
                let out = population_from_table(&table, year);
                let n = out.rejected.len();
                self.population.extend(out);
                n
            }
        };
        if rejected > 0 {
            warn!(measure = measure.name(), year, count = rejected, "dropped rows without a municipality code");
        }
        debug!(measure = measure.name(), year, rows = table.rows.len(), "page parsed");
        Ok(())
    }

    pub fn rejected(&self) -> impl Iterator<Item = &RejectedRow> {
        self.births
            .rejected
            .iter()
            .chain(&self.spending.rejected)
            .chain(&self.population.rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 2]]) -> RawTable {
        RawTable {
            headers: vec!["Município".into(), "Nascim p/resid.mãe".into()],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn total_row_dropped_silently_others_reported() {
        let t = table(&[
            ["Total", "3.206.761"],
            ["110001 Alta Floresta D'Oeste", "412"],
            ["110002 Ariquemes", "-"],
            ["IGNORADO", "12"],
            ["110003 Cabixi", "n/d"],
        ]);
        let out = births_from_table(&t, 2000);
        assert_eq!(
            out.records,
            vec![
                BirthRecord { year: 2000, mun_code: 110001, births: 412 },
                BirthRecord { year: 2000, mun_code: 110002, births: 0 },
            ]
        );
        assert_eq!(out.rejected.len(), 2);
        assert_eq!(out.rejected[0].label, "IGNORADO");
        assert_eq!(out.rejected[0].year, Some(2000));
        assert!(out.rejected[1].reason.contains("n/d"));
    }

    #[test]
    fn spending_keeps_decimals() {
        let t = table(&[["Total", "250,10"], ["355030 SAO PAULO", "1.201,55"]]);
        let out = spending_from_table(&t, 2010);
        assert_eq!(out.records[0].pc_spend, 1201.55);
        assert_eq!(out.records[0].mun_code, 355030);
    }

    #[test]
    fn pages_route_to_their_measure() -> Result<()> {
        let html = r#"<table>
              <tr><th>Munic-BR</th><th>2003</th><th>Total</th></tr>
              <tr><th>Total</th><td>180.000.000</td><td>180.000.000</td></tr>
              <tr><th>110001 ALTA FLORESTA D'OESTE</th><td>26.000</td><td>26.000</td></tr>
            </table>"#;
        let mut tables = TabnetTables::default();
        tables.add_page(Measure::Population, 2003, html)?;
        assert_eq!(
            tables.population.records,
            vec![PopulationRecord { year: 2003, mun_code: 110001, pop: 26_000 }]
        );
        assert!(tables.births.records.is_empty());
        assert_eq!(tables.rejected().count(), 0);

        let err = tables.add_page(Measure::Spending, 2004, html).unwrap_err();
        assert!(format!("{err:#}").contains("spending table for 2004"));
        Ok(())
    }
}
