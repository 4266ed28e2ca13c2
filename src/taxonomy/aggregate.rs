//! Collapse raw rows onto resolved labels, summing their abundances.

use crate::data::{AbundanceMatrix, Rank, RawAbundanceTable};
use crate::error::{Result, TaxonError};
use crate::taxonomy::lineage::LineageResolver;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels that count as "no taxon" and go to the rank's Other bucket.
const UNRESOLVED_LABELS: [&str; 2] = ["#VALUE", "nan"];

/// How many coerced cells to keep as examples in the report.
const MAX_COERCION_EXAMPLES: usize = 10;

/// A cell whose text was not a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercedCell {
    /// Input row index.
    pub row: usize,
    pub sample: String,
    pub text: String,
}

/// Non-fatal diagnostics for numeric coercion during aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoercionReport {
    /// Cells inspected.
    pub n_cells: usize,
    /// Blank or NaN cells, treated as zero.
    pub n_missing: usize,
    /// Non-numeric cells, treated as zero.
    pub n_coerced: usize,
    /// First few coerced cells.
    pub examples: Vec<CoercedCell>,
}

impl CoercionReport {
    /// Whether any non-numeric cell was seen.
    pub fn has_warnings(&self) -> bool {
        self.n_coerced > 0
    }
}

impl std::fmt::Display for CoercionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} cells were non-numeric and counted as zero ({} blank)",
            self.n_coerced, self.n_cells, self.n_missing
        )
    }
}

/// Result of aggregating a raw table at one rank.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Absolute abundances, one row per distinct label in label order.
    pub matrix: AbundanceMatrix,
    pub coercion: CoercionReport,
    /// Raw rows consumed.
    pub n_input_rows: usize,
    /// Placeholder labels synthesized while resolving.
    pub n_placeholders: usize,
}

/// Whether a resolved label carries no taxon.
pub fn is_unresolved_label(label: &str) -> bool {
    let trimmed = label.trim();
    trimmed.is_empty() || UNRESOLVED_LABELS.contains(&trimmed)
}

/// Parse one abundance cell.
enum Cell {
    Value(f64),
    Missing,
    NotNumeric,
}

fn parse_cell(text: &str) -> Cell {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Cell::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Cell::Missing,
        Ok(v) => Cell::Value(v),
        Err(_) => Cell::NotNumeric,
    }
}

/// Sum the rows of `table` by their resolved `labels`.
///
/// Unresolved labels are renamed to the rank's Other bucket first. Blank and
/// non-numeric cells add zero; the latter are counted in the report. Output
/// rows are in byte-wise label order.
pub fn aggregate_taxa(table: &RawAbundanceTable, labels: &[String], rank: Rank) -> Result<Aggregation> {
    if labels.len() != table.n_rows() {
        return Err(TaxonError::InvalidParameter(format!(
            "{} labels for {} rows",
            labels.len(),
            table.n_rows()
        )));
    }

    let n_samples = table.n_samples();
    let other = rank.other_bucket_name();
    let mut report = CoercionReport::default();
    let mut sums: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for (i, (row, label)) in table.rows().iter().zip(labels).enumerate() {
        let key = if is_unresolved_label(label) {
            other
        } else {
            label.as_str()
        };
        let acc = sums.entry(key).or_insert_with(|| vec![0.0; n_samples]);

        for (j, text) in row.cells.iter().enumerate() {
            report.n_cells += 1;
            match parse_cell(text) {
                Cell::Value(v) => acc[j] += v,
                Cell::Missing => report.n_missing += 1,
                Cell::NotNumeric => {
                    report.n_coerced += 1;
                    if report.examples.len() < MAX_COERCION_EXAMPLES {
                        report.examples.push(CoercedCell {
                            row: i,
                            sample: table.sample_ids()[j].clone(),
                            text: text.clone(),
                        });
                    }
                }
            }
        }
    }

    if report.has_warnings() {
        warn!("{}", report);
    }
    debug!(
        "Aggregated {} rows into {} {} labels",
        table.n_rows(),
        sums.len(),
        rank
    );

    let (taxa, rows): (Vec<String>, Vec<Vec<f64>>) =
        sums.into_iter().map(|(k, v)| (k.to_string(), v)).unzip();
    let matrix = AbundanceMatrix::from_rows(taxa, table.sample_ids().to_vec(), &rows)?;

    Ok(Aggregation {
        matrix,
        coercion: report,
        n_input_rows: table.n_rows(),
        n_placeholders: 0,
    })
}

/// Resolve every lineage at `rank` with a fresh serial counter, then aggregate.
pub fn resolve_and_aggregate(table: &RawAbundanceTable, rank: Rank) -> Result<Aggregation> {
    let resolver = LineageResolver::new(rank)?;
    let (labels, serial) = resolver.resolve_all(table.lineages());
    let mut aggregation = aggregate_taxa(table, &labels, rank)?;
    aggregation.n_placeholders = serial.issued();
    Ok(aggregation)
}
