use anyhow::Result;
use imrpanel::{logging::init_logging, pipeline, PipelineConfig};
use tracing::info;

fn main() -> Result<()> {
    init_logging();
    let cfg = PipelineConfig::load()?;
    let s = pipeline::run_summarize(&cfg)?;
    info!(
        municipalities = s.shifts_municipality.len(),
        states = s.shifts_state.len(),
        "summaries written"
    );
    Ok(())
}
