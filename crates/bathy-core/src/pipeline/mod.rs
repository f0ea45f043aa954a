pub mod config;
pub mod orchestrator;
pub mod output;
pub mod types;

pub use config::PipelineConfig;
pub use orchestrator::{run_pipeline, run_pipeline_reported};
pub use types::{Artifacts, PipelineOutput, PipelineStage, ProgressReporter};
