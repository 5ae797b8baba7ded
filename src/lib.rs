pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod panel;
pub mod pipeline;
pub mod process;
pub mod schema;

pub use config::PipelineConfig;
pub use error::PanelError;
