//! Pipeline runner composing resolution, aggregation, normalization,
//! group summaries and collapsing.

use crate::collapse::{collapse_taxa, CollapsePolicy, Collapsed};
use crate::data::{
    AbundanceMatrix, CleanedTable, GroupedMatrix, Metadata, Rank, RawAbundanceTable,
    TableOrientation, TidyTable,
};
use crate::error::{Result, TaxonError};
use crate::normalize::norm_percent;
use crate::summarize::summarize_groups;
use crate::taxonomy::{aggregate_taxa, CoercionReport, LineageResolver};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A stage of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Resolve each lineage to a label at the target rank.
    Resolve,
    /// Sum rows sharing a label.
    Aggregate,
    /// Convert sample columns to percentages.
    Normalize,
    /// Average samples within each attribute level.
    Summarize,
    /// Rank taxa and fold the tail into Other.
    Collapse,
}

impl PipelineStage {
    /// Stages needed for the cleaned per-sample table.
    pub const CLEAN: [PipelineStage; 3] = [
        PipelineStage::Resolve,
        PipelineStage::Aggregate,
        PipelineStage::Normalize,
    ];

    /// Every stage.
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::Resolve,
        PipelineStage::Aggregate,
        PipelineStage::Normalize,
        PipelineStage::Summarize,
        PipelineStage::Collapse,
    ];
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Resolve => "resolve",
            PipelineStage::Aggregate => "aggregate",
            PipelineStage::Normalize => "normalize",
            PipelineStage::Summarize => "summarize",
            PipelineStage::Collapse => "collapse",
        };
        write!(f, "{}", name)
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rank name or abbreviation, e.g. `genus` or `g`.
    pub rank: String,
    /// Categorical metadata attribute to group samples by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// Layout of the abundance file.
    #[serde(default)]
    pub orientation: TableOrientation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_taxa: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(TaxonError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(TaxonError::from)
    }

    /// Load from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

/// Everything a full run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rank: Rank,
    pub policy: CollapsePolicy,
    /// Aggregated absolute abundances.
    pub counts: AbundanceMatrix,
    /// Per-sample percentages.
    pub percent: AbundanceMatrix,
    /// Per-group means before collapsing.
    pub grouped: GroupedMatrix,
    pub collapsed: Collapsed,
    /// Renderer handoff built from the collapsed matrix.
    pub tidy: TidyTable,
    pub coercion: CoercionReport,
    pub n_placeholders: usize,
}

/// Builder for constructing and running summary pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    rank: String,
    attribute: Option<String>,
    orientation: TableOrientation,
    top_taxa: Option<usize>,
    threshold: Option<f64>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline at genus rank with no grouping attribute and no collapsing.
    pub fn new() -> Self {
        Self {
            name: "unnamed".to_string(),
            rank: Rank::Genus.display_name().to_string(),
            attribute: None,
            orientation: TableOrientation::default(),
            top_taxa: None,
            threshold: None,
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            name: config.name.clone(),
            rank: config.rank.clone(),
            attribute: config.attribute.clone(),
            orientation: config.orientation,
            top_taxa: config.top_taxa,
            threshold: config.threshold,
        }
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            rank: self.rank.clone(),
            attribute: self.attribute.clone(),
            orientation: self.orientation,
            top_taxa: self.top_taxa,
            threshold: self.threshold,
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the target rank by name or abbreviation. Checked when the pipeline runs.
    pub fn rank(mut self, rank: &str) -> Self {
        self.rank = rank.to_string();
        self
    }

    /// Group samples by a categorical metadata attribute.
    pub fn group_by(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    /// Layout of the abundance file read by [`Pipeline::load`].
    pub fn orientation(mut self, orientation: TableOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Keep only the `n` most abundant taxa.
    pub fn top_taxa(mut self, n: usize) -> Self {
        self.top_taxa = Some(n);
        self
    }

    /// Keep only taxa whose mean abundance reaches `t` percent.
    pub fn threshold(mut self, t: f64) -> Self {
        self.threshold = Some(t);
        self
    }

    /// The target rank, parsed.
    pub fn target_rank(&self) -> Result<Rank> {
        Rank::parse(&self.rank)
    }

    /// The collapse policy from the configured options.
    pub fn policy(&self) -> Result<CollapsePolicy> {
        CollapsePolicy::from_options(self.top_taxa, self.threshold)
    }

    /// Load the metadata table, then the abundance table without any column
    /// that also appears in the metadata header.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        abundance: P,
        metadata: Q,
    ) -> Result<(RawAbundanceTable, Metadata)> {
        let metadata = Metadata::from_path(metadata)?;
        let raw = RawAbundanceTable::from_path(abundance, self.orientation, &metadata.header())?;
        info!(
            "Loaded {} rows x {} samples and {} metadata rows",
            raw.n_rows(),
            raw.n_samples(),
            metadata.n_samples()
        );
        Ok((raw, metadata))
    }

    /// Check every precondition a run owns before any stage starts.
    ///
    /// Errors are returned unwrapped: `InvalidRank`, `ConflictingPolicy`,
    /// `InvalidParameter` or `InvalidAttribute`.
    pub fn validate(&self, metadata: &Metadata) -> Result<(Rank, CollapsePolicy, String)> {
        let rank = self.target_rank()?;
        let policy = self.policy()?;
        let attribute = self.attribute.clone().ok_or_else(|| {
            TaxonError::InvalidParameter("no grouping attribute selected".to_string())
        })?;
        metadata.require_categorical(&attribute)?;
        Ok((rank, policy, attribute))
    }

    /// Run every stage and build the renderer handoff.
    pub fn run(&self, raw: &RawAbundanceTable, metadata: &Metadata) -> Result<PipelineOutput> {
        let (rank, policy, attribute) = self.validate(metadata)?;
        info!(
            "Running '{}' at {} rank grouped by '{}' (collapse: {})",
            self.name, rank, attribute, policy
        );

        let state = run_stages(
            PipelineState::new(raw, metadata, rank, &attribute, policy),
            &PipelineStage::ALL,
        )?;
        state.finalize()
    }

    /// Resolve, aggregate and normalize, then join the metadata per sample.
    ///
    /// No grouping attribute is needed.
    pub fn clean(&self, raw: &RawAbundanceTable, metadata: &Metadata) -> Result<CleanedTable> {
        let rank = self.target_rank()?;
        info!("Cleaning '{}' at {} rank", self.name, rank);

        let state = run_stages(
            PipelineState::new(raw, metadata, rank, "", CollapsePolicy::None),
            &PipelineStage::CLEAN,
        )?;
        let percent = state
            .percent
            .ok_or_else(|| TaxonError::Pipeline("Percentages not computed".to_string()))?;
        Ok(CleanedTable::build(&percent, metadata))
    }
}

/// Apply `stages` in order.
///
/// Input errors keep their kind; anything else is reported as a
/// [`TaxonError::Stage`] naming the step that failed.
fn run_stages<'a>(
    mut state: PipelineState<'a>,
    stages: &[PipelineStage],
) -> Result<PipelineState<'a>> {
    for (i, stage) in stages.iter().enumerate() {
        state = state.apply(*stage).map_err(|e| {
            if e.is_input_error() {
                e
            } else {
                TaxonError::Stage {
                    step: i + 1,
                    stage: stage.to_string(),
                    source: Box::new(e),
                }
            }
        })?;
    }
    Ok(state)
}

/// Internal state during pipeline execution.
struct PipelineState<'a> {
    raw: &'a RawAbundanceTable,
    metadata: &'a Metadata,
    rank: Rank,
    attribute: &'a str,
    policy: CollapsePolicy,
    labels: Option<Vec<String>>,
    n_placeholders: usize,
    counts: Option<AbundanceMatrix>,
    coercion: CoercionReport,
    percent: Option<AbundanceMatrix>,
    grouped: Option<GroupedMatrix>,
    collapsed: Option<Collapsed>,
}

impl<'a> PipelineState<'a> {
    fn new(
        raw: &'a RawAbundanceTable,
        metadata: &'a Metadata,
        rank: Rank,
        attribute: &'a str,
        policy: CollapsePolicy,
    ) -> Self {
        Self {
            raw,
            metadata,
            rank,
            attribute,
            policy,
            labels: None,
            n_placeholders: 0,
            counts: None,
            coercion: CoercionReport::default(),
            percent: None,
            grouped: None,
            collapsed: None,
        }
    }

    fn apply(mut self, stage: PipelineStage) -> Result<Self> {
        match stage {
            PipelineStage::Resolve => {
                let resolver = LineageResolver::new(self.rank)?;
                let (labels, serial) = resolver.resolve_all(self.raw.lineages());
                self.n_placeholders = serial.issued();
                info!(
                    "Resolved {} lineages at {} rank ({} placeholders)",
                    labels.len(),
                    self.rank,
                    self.n_placeholders
                );
                self.labels = Some(labels);
            }
            PipelineStage::Aggregate => {
                let labels = self.labels.as_ref().ok_or_else(|| {
                    TaxonError::Pipeline("Must resolve lineages before aggregating".to_string())
                })?;
                let aggregation = aggregate_taxa(self.raw, labels, self.rank)?;
                info!(
                    "Aggregated {} rows into {} taxa",
                    aggregation.n_input_rows,
                    aggregation.matrix.n_taxa()
                );
                self.coercion = aggregation.coercion;
                self.counts = Some(aggregation.matrix);
            }
            PipelineStage::Normalize => {
                let counts = self.counts.as_ref().ok_or_else(|| {
                    TaxonError::Pipeline("Must aggregate before normalizing".to_string())
                })?;
                self.percent = Some(norm_percent(counts)?);
            }
            PipelineStage::Summarize => {
                let percent = self.percent.as_ref().ok_or_else(|| {
                    TaxonError::Pipeline("Must normalize before summarizing".to_string())
                })?;
                let grouped = summarize_groups(percent, self.metadata, self.attribute)?;
                info!(
                    "Summarized {} samples into {} '{}' groups",
                    percent.n_samples(),
                    grouped.n_groups(),
                    self.attribute
                );
                self.grouped = Some(grouped);
            }
            PipelineStage::Collapse => {
                let grouped = self.grouped.as_ref().ok_or_else(|| {
                    TaxonError::Pipeline("Must summarize before collapsing".to_string())
                })?;
                let collapsed = collapse_taxa(grouped, &self.policy, self.rank)?;
                info!(
                    "Collapsed to {} taxa ({} folded into {})",
                    collapsed.matrix.n_taxa(),
                    collapsed.n_collapsed,
                    self.rank.other_bucket_name()
                );
                self.collapsed = Some(collapsed);
            }
        }
        Ok(self)
    }

    fn finalize(self) -> Result<PipelineOutput> {
        let counts = self
            .counts
            .ok_or_else(|| TaxonError::Pipeline("Counts not aggregated".to_string()))?;
        let percent = self
            .percent
            .ok_or_else(|| TaxonError::Pipeline("Percentages not computed".to_string()))?;
        let grouped = self
            .grouped
            .ok_or_else(|| TaxonError::Pipeline("Groups not summarized".to_string()))?;
        let collapsed = self
            .collapsed
            .ok_or_else(|| TaxonError::Pipeline("Pipeline must include a collapse step".to_string()))?;

        let tidy = TidyTable::from_grouped(&collapsed.matrix, self.rank);

        Ok(PipelineOutput {
            rank: self.rank,
            policy: self.policy,
            counts,
            percent,
            grouped,
            collapsed,
            tidy,
            coercion: self.coercion,
            n_placeholders: self.n_placeholders,
        })
    }
}

/// Convenience function to summarize a table at one rank with an optional
/// top-N or threshold cut.
pub fn summarize_table(
    raw: &RawAbundanceTable,
    metadata: &Metadata,
    rank: &str,
    attribute: &str,
    top_taxa: Option<usize>,
    threshold: Option<f64>,
) -> Result<PipelineOutput> {
    let mut pipeline = Pipeline::new().name("summary").rank(rank).group_by(attribute);
    pipeline.top_taxa = top_taxa;
    pipeline.threshold = threshold;
    pipeline.run(raw, metadata)
}
