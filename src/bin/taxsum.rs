//! taxsum - taxonomy summary CLI
//!
//! Command-line interface for resolving, aggregating and summarizing
//! microbiome abundance tables at a taxonomic rank.

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use taxon_summary::data::TableOrientation;
use taxon_summary::error::Result;
use taxon_summary::pipeline::{Pipeline, PipelineConfig, PipelineOutput};

/// CLI-friendly table orientation enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOrientation {
    /// One row per lineage, one column per sample
    TaxaBySamples,
    /// One row per sample, one column per lineage (barplot exports)
    SamplesByTaxa,
}

impl From<CliOrientation> for TableOrientation {
    fn from(orientation: CliOrientation) -> Self {
        match orientation {
            CliOrientation::TaxaBySamples => TableOrientation::TaxaBySamples,
            CliOrientation::SamplesByTaxa => TableOrientation::SamplesByTaxa,
        }
    }
}

/// Output format for the summary table
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Long-form TSV: taxon, group, abundance
    Tsv,
    /// Tidy table with chart titles as JSON
    Json,
}

/// Taxonomy-aware abundance summaries
#[derive(Parser)]
#[command(name = "taxsum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, aggregate and normalize, then join metadata per sample
    Clean {
        /// Path to abundance table (CSV or TSV)
        #[arg(short, long)]
        abundance: PathBuf,

        /// Path to metadata table (CSV or TSV)
        #[arg(short, long)]
        metadata: PathBuf,

        /// Taxonomic rank (e.g., genus, g, class)
        #[arg(short, long)]
        rank: String,

        /// Layout of the abundance table
        #[arg(long, value_enum, default_value = "taxa-by-samples")]
        orientation: CliOrientation,

        /// Output path for the cleaned TSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize percentages per metadata group
    Summarize {
        /// Path to abundance table (CSV or TSV)
        #[arg(short, long)]
        abundance: PathBuf,

        /// Path to metadata table (CSV or TSV)
        #[arg(short, long)]
        metadata: PathBuf,

        /// Taxonomic rank (e.g., genus, g, class)
        #[arg(short, long)]
        rank: String,

        /// Categorical metadata attribute to group by
        #[arg(short, long)]
        group: String,

        /// Keep only the N most abundant taxa
        #[arg(long)]
        top_taxa: Option<usize>,

        /// Keep only taxa with mean abundance >= this percentage
        #[arg(long)]
        threshold: Option<f64>,

        /// Layout of the abundance table
        #[arg(long, value_enum, default_value = "taxa-by-samples")]
        orientation: CliOrientation,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: OutputFormat,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Path to abundance table (CSV or TSV)
        #[arg(short, long)]
        abundance: PathBuf,

        /// Path to metadata table (CSV or TSV)
        #[arg(short, long)]
        metadata: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: OutputFormat,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for example YAML
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean {
            abundance,
            metadata,
            rank,
            orientation,
            output,
        } => cmd_clean(&abundance, &metadata, &rank, orientation.into(), &output),

        Commands::Summarize {
            abundance,
            metadata,
            rank,
            group,
            top_taxa,
            threshold,
            orientation,
            format,
            output,
        } => {
            let mut pipeline = Pipeline::new()
                .name("summarize")
                .rank(&rank)
                .group_by(&group)
                .orientation(orientation.into());
            if let Some(n) = top_taxa {
                pipeline = pipeline.top_taxa(n);
            }
            if let Some(t) = threshold {
                pipeline = pipeline.threshold(t);
            }
            cmd_summarize(&pipeline, &abundance, &metadata, format, &output)
        }

        Commands::Run {
            config,
            abundance,
            metadata,
            format,
            output,
        } => cmd_run(&config, &abundance, &metadata, format, &output),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Write the cleaned per-sample table
fn cmd_clean(
    abundance_path: &Path,
    metadata_path: &Path,
    rank: &str,
    orientation: TableOrientation,
    output_path: &Path,
) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("clean")
        .rank(rank)
        .orientation(orientation);
    // Fail on a bad rank before reading any file.
    pipeline.target_rank()?;

    let (raw, metadata) = pipeline.load(abundance_path, metadata_path)?;
    let cleaned = pipeline.clean(&raw, &metadata)?;

    info!("Writing cleaned table to {:?}", output_path);
    cleaned.to_tsv(output_path)?;
    info!("Done! {} samples written", cleaned.n_samples());
    Ok(())
}

/// Run a full summary
fn cmd_summarize(
    pipeline: &Pipeline,
    abundance_path: &Path,
    metadata_path: &Path,
    format: OutputFormat,
    output_path: &Path,
) -> Result<()> {
    // Rank and policy problems are reported before any file is read.
    pipeline.target_rank()?;
    pipeline.policy()?;

    let (raw, metadata) = pipeline.load(abundance_path, metadata_path)?;
    let output = pipeline.run(&raw, &metadata)?;
    write_output(&output, format, output_path)
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &Path,
    abundance_path: &Path,
    metadata_path: &Path,
    format: OutputFormat,
    output_path: &Path,
) -> Result<()> {
    info!("Loading pipeline configuration from {:?}", config_path);
    let config = PipelineConfig::from_path(config_path)?;
    let pipeline = Pipeline::from_config(&config);
    cmd_summarize(&pipeline, abundance_path, metadata_path, format, output_path)
}

fn write_output(output: &PipelineOutput, format: OutputFormat, output_path: &Path) -> Result<()> {
    if output.coercion.has_warnings() {
        warn!("{}", output.coercion);
        for cell in &output.coercion.examples {
            warn!("  row {}, sample {}: {:?}", cell.row + 1, cell.sample, cell.text);
        }
    }

    info!("Writing {} to {:?}", output.tidy.title, output_path);
    match format {
        OutputFormat::Tsv => output.tidy.to_tsv(output_path)?,
        OutputFormat::Json => std::fs::write(output_path, output.tidy.to_json()?)?,
    }

    info!(
        "Done! {} taxa x {} '{}' groups",
        output.tidy.taxa.len(),
        output.tidy.groups.len(),
        output.tidy.attribute
    );
    Ok(())
}

/// Generate example configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-genus-summary")
        .rank("genus")
        .group_by("Treatment")
        .orientation(TableOrientation::SamplesByTaxa)
        .top_taxa(10);

    let config = pipeline.to_config(Some(
        "Top ten genera per treatment group from a per-level barplot export",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    info!("Wrote example pipeline to {:?}", output_path);
    println!("{}", yaml);

    Ok(())
}
