// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::PanelError;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "pipeline.yaml";
/// Environment variable overriding [`CONFIG_FILE`].
pub const CONFIG_ENV: &str = "IMRPANEL_CONFIG";

/// Years the pipeline accepts; the source systems start in the 1990s.
pub const YEAR_BOUNDS: std::ops::RangeInclusive<i32> = 1900..=2100;
pub const MAX_RETRIES: u32 = 16;

pub const SINASC_URL: &str = "http://tabnet.datasus.gov.br/cgi/tabcgi.exe?sinasc/cnv/nvbr.def";
pub const SIOPS_URL: &str =
    "http://siops-asp.datasus.gov.br/CGI/tabcgi.exe?SIOPS/serhist/municipio/mIndicadores.def";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_folder: PathBuf,
    pub clean_folder: PathBuf,
    pub summary_folder: PathBuf,
    pub final_csv: PathBuf,
    pub final_parquet: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub sinasc_url: String,
    pub siops_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_folder: PathBuf::from("raw_data"),
            clean_folder: PathBuf::from("clean_data"),
            summary_folder: PathBuf::from("summary_data"),
            final_csv: PathBuf::from("df_final.csv"),
            final_parquet: PathBuf::from("df_final.parquet"),
            start_year: 2000,
            end_year: 2019,
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            sinasc_url: SINASC_URL.to_string(),
            siops_url: SIOPS_URL.to_string(),
            timeout_secs: 20,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_concurrency: 3,
        }
    }
}

impl PipelineConfig {
    /// Load from `$IMRPANEL_CONFIG`, else `pipeline.yaml` if it exists, else defaults.
    pub fn load() -> Result<Self> {
        let path = env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        if path.exists() {
            Self::from_file(&path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            let cfg = Self::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Default layout with every folder and output file placed under `root`.
    pub fn rooted_at(root: &Path) -> Self {
        let d = Self::default();
        Self {
            raw_folder: root.join(d.raw_folder),
            clean_folder: root.join(d.clean_folder),
            summary_folder: root.join(d.summary_folder),
            final_csv: root.join(d.final_csv),
            final_parquet: root.join(d.final_parquet),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.start_year > self.end_year {
            return Err(PanelError::InvalidYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        if !YEAR_BOUNDS.contains(&self.start_year) || !YEAR_BOUNDS.contains(&self.end_year) {
            return Err(PanelError::Config(format!(
                "years must lie within {}..={}",
                YEAR_BOUNDS.start(),
                YEAR_BOUNDS.end()
            )));
        }
        if self.fetch.max_retries > MAX_RETRIES {
            return Err(PanelError::Config(format!(
                "fetch.max_retries must be <= {}",
                MAX_RETRIES
            )));
        }
        if self.fetch.max_concurrency == 0 {
            return Err(PanelError::Config("fetch.max_concurrency must be > 0".into()));
        }
        Ok(())
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    // ─── input artifacts ─────────────────────────────────────────────
    pub fn sim_zip(&self) -> PathBuf {
        self.raw_folder.join("sim_microdata.zip")
    }
    pub fn municipalities_csv(&self) -> PathBuf {
        self.raw_folder.join("municipios.csv")
    }
    pub fn ipca_csv(&self) -> PathBuf {
        self.raw_folder.join("ipca.csv")
    }

    // ─── intermediate artifacts ──────────────────────────────────────
    pub fn mortality_csv(&self) -> PathBuf {
        self.clean_folder.join("df_sim.csv")
    }
    pub fn births_csv(&self) -> PathBuf {
        self.clean_folder.join("df_births.csv")
    }
    pub fn spending_csv(&self) -> PathBuf {
        self.clean_folder.join("df_spend.csv")
    }
    pub fn population_csv(&self) -> PathBuf {
        self.clean_folder.join("df_pop.csv")
    }
    pub fn price_index_csv(&self) -> PathBuf {
        self.clean_folder.join("df_ipca.csv")
    }
    pub fn rejected_json(&self) -> PathBuf {
        self.clean_folder.join("rejected_rows.json")
    }

    // ─── summaries ───────────────────────────────────────────────────
    pub fn summary_csv(&self, name: &str) -> PathBuf {
        self.summary_folder.join(format!("{}.csv", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_fixed_layout() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.years().count(), 20);
        assert_eq!(cfg.mortality_csv(), PathBuf::from("clean_data/df_sim.csv"));
        assert_eq!(cfg.sim_zip(), PathBuf::from("raw_data/sim_microdata.zip"));
        assert_eq!(cfg.fetch.timeout_secs, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "start_year: 2010\nfetch:\n  max_retries: 5")?;
        let cfg = PipelineConfig::from_file(tmp.path())?;
        assert_eq!(cfg.start_year, 2010);
        assert_eq!(cfg.end_year, 2019);
        assert_eq!(cfg.fetch.max_retries, 5);
        assert_eq!(cfg.fetch.max_concurrency, 3);
        Ok(())
    }

    #[test]
    fn inverted_year_range_is_rejected() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "start_year: 2020\nend_year: 2000")?;
        let err = PipelineConfig::from_file(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("invalid year range"));
        Ok(())
    }

    #[test]
    fn out_of_bounds_values_are_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.fetch.max_retries = 64;
        assert!(matches!(cfg.validate(), Err(PanelError::Config(_))));

        let mut cfg = PipelineConfig::default();
        cfg.start_year = i32::MIN;
        cfg.end_year = i32::MAX;
        assert!(matches!(cfg.validate(), Err(PanelError::Config(_))));

        let mut cfg = PipelineConfig::default();
        cfg.fetch.max_retries = MAX_RETRIES;
        assert!(cfg.validate().is_ok());
    }
}
