//! Long-form output handed to a stacked-bar renderer.

use crate::data::abundance_matrix::format_cell;
use crate::data::{GroupedMatrix, Rank};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Y-axis label for relative abundance charts.
pub const Y_AXIS_LABEL: &str = "Relative Abundance (%)";

/// One taxon × group cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub taxon: String,
    pub group: String,
    /// Abundance in percent; `None` where the cell is undefined.
    pub value: Option<f64>,
}

/// Final ordered table plus the text a renderer needs for titles and axes.
///
/// `taxa` fixes the stacking and legend order. Records are emitted taxon-major
/// in that order, groups in column order within each taxon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidyTable {
    pub rank: Rank,
    /// Display name of the grouping attribute (x-axis label).
    pub attribute: String,
    pub taxa: Vec<String>,
    pub groups: Vec<String>,
    pub records: Vec<TidyRecord>,
    pub title: String,
    pub legend_title: String,
    pub y_label: String,
}

impl TidyTable {
    /// Melt a grouped matrix into long form.
    pub fn from_grouped(grouped: &GroupedMatrix, rank: Rank) -> Self {
        let mut records = Vec::with_capacity(grouped.n_taxa() * grouped.n_groups());
        for (i, taxon) in grouped.taxa().iter().enumerate() {
            for (j, group) in grouped.groups().iter().enumerate() {
                let value = grouped.get(i, j);
                records.push(TidyRecord {
                    taxon: taxon.clone(),
                    group: group.clone(),
                    value: (!value.is_nan()).then_some(value),
                });
            }
        }

        Self {
            rank,
            attribute: grouped.attribute().to_string(),
            taxa: grouped.taxa().to_vec(),
            groups: grouped.groups().to_vec(),
            records,
            title: format!("Relative Abundance of Microbial {}", rank.plural_name()),
            legend_title: format!("Microorganism {}", rank.plural_name()),
            y_label: Y_AXIS_LABEL.to_string(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for one taxon, in group order.
    pub fn records_for<'a>(&'a self, taxon: &'a str) -> impl Iterator<Item = &'a TidyRecord> + 'a {
        self.records.iter().filter(move |r| r.taxon == taxon)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write records as TSV with columns `Taxa`, the attribute name and `Abundance`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "Taxa\t{}\tAbundance", self.attribute)?;
        for record in &self.records {
            writeln!(
                writer,
                "{}\t{}\t{}",
                record.taxon,
                record.group,
                format_cell(record.value.unwrap_or(f64::NAN))
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}
