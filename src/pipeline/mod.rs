//! Pipeline composition and execution for ALDEx2 analyses.

mod runner;

pub use runner::{run_aldex2_differences, Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
