//! Pipeline composition and execution for taxonomy summaries.

mod runner;

pub use runner::{
    summarize_table, Pipeline, PipelineConfig, PipelineOutput, PipelineStage,
};
