use anyhow::Result;
use imrpanel::{logging::init_logging, pipeline, PipelineConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cfg = PipelineConfig::load()?;
    info!(raw = %cfg.raw_folder.display(), clean = %cfg.clean_folder.display(), "import");
    let tables = pipeline::run_import(&cfg).await?;
    info!(rejected = tables.rejected().len(), "import finished");
    Ok(())
}
