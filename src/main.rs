use anyhow::Result;
use imrpanel::{logging::init_logging, pipeline, PipelineConfig};
use std::fs;
use tokio::time::Instant;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_logging();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure dirs ───────────────────────────────────────────
    let cfg = PipelineConfig::load()?;
    for d in [&cfg.raw_folder, &cfg.clean_folder, &cfg.summary_folder] {
        fs::create_dir_all(d)?;
    }

    // ─── 3) import ───────────────────────────────────────────────────
    let start = Instant::now();
    pipeline::run_import(&cfg).await?;
    info!(elapsed = ?start.elapsed(), "import stage finished");

    // ─── 4) consolidate ──────────────────────────────────────────────
    let start = Instant::now();
    let panel = pipeline::run_consolidate(&cfg)?;
    info!(rows = panel.len(), elapsed = ?start.elapsed(), "consolidate stage finished");

    // ─── 5) summarize ────────────────────────────────────────────────
    pipeline::run_summarize(&cfg)?;

    info!("all done");
    Ok(())
}
