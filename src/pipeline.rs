// src/pipeline.rs
//! The three stages. They share nothing in memory: each one reads the files
//! the previous one wrote.

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::fetch::{build_client, fetch_pages};
use crate::panel::rates::derive_all;
use crate::panel::summary::{summarize, PanelRow, Summaries};
use crate::panel::{build_panel, Panel, Sources};
use crate::process::mortality::extract_mortality;
use crate::process::municipality::load_municipalities;
use crate::process::price_index::extract_price_index;
use crate::process::tabnet::TabnetTables;
use crate::process::{Extracted, RejectedRow};
use crate::schema::types::{MortalityRecord, PriceIndexRecord};
use crate::schema::{panel_to_batch, read_records, write_csv, write_json, write_parquet, write_records};

/// Everything the import stage produces, before it is written out.
#[derive(Debug, Default)]
pub struct ImportTables {
    pub mortality: Extracted<MortalityRecord>,
    pub price_index: Vec<PriceIndexRecord>,
    pub tabnet: TabnetTables,
}

impl ImportTables {
    pub fn rejected(&self) -> Vec<&RejectedRow> {
        self.mortality
            .rejected
            .iter()
            .chain(self.tabnet.rejected())
            .collect()
    }
}

/// Write the intermediate tables and the rejected-rows report.
pub fn write_import(cfg: &PipelineConfig, tables: &ImportTables) -> Result<()> {
    write_records(&cfg.mortality_csv(), &tables.mortality.records)?;
    write_records(&cfg.births_csv(), &tables.tabnet.births.records)?;
    write_records(&cfg.spending_csv(), &tables.tabnet.spending.records)?;
    write_records(&cfg.population_csv(), &tables.tabnet.population.records)?;
    write_records(&cfg.price_index_csv(), &tables.price_index)?;

    let rejected = tables.rejected();
    if !rejected.is_empty() {
        warn!(count = rejected.len(), path = %cfg.rejected_json().display(), "input rows rejected");
    }
    write_json(&cfg.rejected_json(), &rejected)?;
    Ok(())
}

#[instrument(level = "info", skip_all)]
pub async fn run_import(cfg: &PipelineConfig) -> Result<ImportTables> {
    // ─── 1) mortality micro-data ─────────────────────────────────────
    let zip = cfg.sim_zip();
    let mortality = tokio::task::spawn_blocking(move || extract_mortality(&zip))
        .await
        .context("mortality extraction task panicked")??;

    // ─── 2) price index ──────────────────────────────────────────────
    let price_index = extract_price_index(&cfg.ipca_csv())?;

    // ─── 3) scrape TabNet ────────────────────────────────────────────
    let client = build_client(&cfg.fetch)?;
    let pages = fetch_pages(&client, &cfg.fetch, cfg.years()).await?;
    let mut tabnet = TabnetTables::default();
    for page in &pages {
        tabnet.add_page(page.measure, page.year, &page.html)?;
    }

    // ─── 4) write tidy tables ────────────────────────────────────────
    let tables = ImportTables {
        mortality,
        price_index,
        tabnet,
    };
    write_import(cfg, &tables)?;
    info!(
        mortality = tables.mortality.records.len(),
        births = tables.tabnet.births.records.len(),
        spending = tables.tabnet.spending.records.len(),
        population = tables.tabnet.population.records.len(),
        years = tables.price_index.len(),
        "import done"
    );
    Ok(tables)
}

/// Build the panel from the intermediate tables and write `df_final`.
#[instrument(level = "info", skip_all)]
pub fn run_consolidate(cfg: &PipelineConfig) -> Result<Panel> {
    let municipalities = load_municipalities(&cfg.municipalities_csv())?;
    let sources = Sources {
        mortality: read_records(&cfg.mortality_csv())?,
        births: read_records(&cfg.births_csv())?,
        spending: read_records(&cfg.spending_csv())?,
        population: read_records(&cfg.population_csv())?,
        price_index: read_records(&cfg.price_index_csv())?,
    };

    let mut panel = build_panel(municipalities, cfg.start_year, cfg.end_year, &sources)?;
    derive_all(&mut panel)?;

    let batch = panel_to_batch(&panel)?;
    write_csv(&batch, &cfg.final_csv)?;
    write_parquet(&batch, &cfg.final_parquet)?;
    info!(rows = panel.len(), columns = batch.num_columns(), "consolidation done");
    Ok(panel)
}

/// Compute the plot-ready aggregates from `df_final.csv`.
#[instrument(level = "info", skip_all)]
pub fn run_summarize(cfg: &PipelineConfig) -> Result<Summaries> {
    let rows: Vec<PanelRow> = read_records(&cfg.final_csv)?;
    let summaries = summarize(&rows, cfg.start_year, cfg.end_year);

    write_records(&cfg.summary_csv("trends_region"), &summaries.trends_region)?;
    write_records(&cfg.summary_csv("trends_cause"), &summaries.trends_cause)?;
    write_records(&cfg.summary_csv("shifts_municipality"), &summaries.shifts_municipality)?;
    write_records(&cfg.summary_csv("state_year"), &summaries.state_year)?;
    write_records(&cfg.summary_csv("shifts_state"), &summaries.shifts_state)?;
    info!(folder = %cfg.summary_folder.display(), "summaries written");
    Ok(summaries)
}

pub async fn run_all(cfg: &PipelineConfig) -> Result<()> {
    run_import(cfg).await?;
    run_consolidate(cfg)?;
    run_summarize(cfg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::BirthRecord;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn import_writes_every_table_and_report() -> Result<()> {
        let dir = tempdir()?;
        let cfg = PipelineConfig::rooted_at(dir.path());
        let mut tables = ImportTables::default();
        tables.mortality.records.push(MortalityRecord::new(110001, 2000));
        tables.mortality.rejected.push(RejectedRow::new("mortality", None, "x,2000", "unparseable municipality code"));
        tables.tabnet.births.records.push(BirthRecord { year: 2000, mun_code: 110001, births: 10 });
        tables.price_index.push(PriceIndexRecord { year: 2000, index: 1.0 });

        write_import(&cfg, &tables)?;

        for path in [
            cfg.mortality_csv(),
            cfg.births_csv(),
            cfg.spending_csv(),
            cfg.population_csv(),
            cfg.price_index_csv(),
        ] {
            assert!(path.exists(), "{}", path.display());
        }
        assert_eq!(fs::read_to_string(cfg.spending_csv())?, "");
        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(cfg.rejected_json())?)?;
        assert_eq!(report[0]["source"], "mortality");
        assert_eq!(report[0]["year"], serde_json::Value::Null);
        Ok(())
    }
}
