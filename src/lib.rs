//! Taxonomy-aware abundance summaries for microbiome tables.
//!
//! Turns a raw abundance table (one row per lineage string, one column per
//! sample) and a sample metadata table into a percentage matrix at a chosen
//! taxonomic rank, averaged per metadata group and ordered for a stacked bar
//! chart.
//!
//! # Overview
//!
//! - **data**: Core data structures (ranks, raw and aggregated tables, metadata, outputs)
//! - **taxonomy**: Lineage resolution and label aggregation
//! - **normalize**: Per-sample percentages
//! - **summarize**: Per-group means over a categorical attribute
//! - **collapse**: Top-N / threshold folding into an Other row
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use taxon_summary::prelude::*;
//!
//! let pipeline = Pipeline::new().rank("genus").group_by("Treatment").top_taxa(10);
//! let (raw, metadata) = pipeline.load("level-7.csv", "metadata.tsv").unwrap();
//!
//! let output = pipeline.run(&raw, &metadata).unwrap();
//! output.tidy.to_tsv("genus_by_treatment.tsv").unwrap();
//! ```

pub mod collapse;
pub mod data;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod summarize;
pub mod taxonomy;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::collapse::{collapse_taxa, CollapsePolicy, Collapsed};
    pub use crate::data::{
        AbundanceMatrix, CleanedTable, GroupedMatrix, Metadata, Rank, RawAbundanceTable, RawRow,
        TableOrientation, TidyRecord, TidyTable, Variable, VariableType,
    };
    pub use crate::error::{Result, TaxonError};
    pub use crate::normalize::{norm_percent, norm_relative};
    pub use crate::pipeline::{
        summarize_table, Pipeline, PipelineConfig, PipelineOutput, PipelineStage,
    };
    pub use crate::summarize::summarize_groups;
    pub use crate::taxonomy::{
        aggregate_taxa, resolve_and_aggregate, Aggregation, CoercionReport, LineageResolver,
        PlaceholderSerial,
    };
}
