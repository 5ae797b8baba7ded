use anyhow::Result;
use imrpanel::{logging::init_logging, pipeline, PipelineConfig};
use tracing::info;

fn main() -> Result<()> {
    init_logging();
    let cfg = PipelineConfig::load()?;
    let panel = pipeline::run_consolidate(&cfg)?;
    info!(
        municipalities = panel.municipalities().len(),
        years = panel.n_years(),
        out = %cfg.final_csv.display(),
        "panel written"
    );
    Ok(())
}
