//! Wide per-sample table of taxon percentages with metadata appended.

use crate::data::abundance_matrix::format_cell;
use crate::data::{AbundanceMatrix, Metadata, Variable};
use crate::error::Result;
use log::warn;
use std::path::Path;

/// One row per sample: key, percentages per taxon, then every metadata attribute.
///
/// The first header is the metadata key header, verbatim, so the table can be
/// joined back onto the metadata it came from.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    key_header: String,
    sample_ids: Vec<String>,
    taxa: Vec<String>,
    attributes: Vec<String>,
    /// Percentages, `values[sample][taxon]`.
    values: Vec<Vec<f64>>,
    /// Metadata, `attribute_values[sample][attribute]`.
    attribute_values: Vec<Vec<Variable>>,
}

impl CleanedTable {
    /// Transpose `percent` to samples × taxa and join `metadata` on sample id.
    ///
    /// Samples absent from the metadata keep empty attribute cells.
    pub fn build(percent: &AbundanceMatrix, metadata: &Metadata) -> Self {
        let attributes = metadata.column_names().to_vec();
        let mut unmatched = 0usize;

        let attribute_values: Vec<Vec<Variable>> = percent
            .sample_ids()
            .iter()
            .map(|sid| {
                if !metadata.has_sample(sid) {
                    unmatched += 1;
                }
                attributes
                    .iter()
                    .map(|a| metadata.get(sid, a).cloned().unwrap_or(Variable::Missing))
                    .collect()
            })
            .collect();
        if unmatched > 0 {
            warn!("{} sample(s) have no metadata row", unmatched);
        }

        let values = (0..percent.n_samples()).map(|j| percent.col(j)).collect();

        Self {
            key_header: metadata.key_header().to_string(),
            sample_ids: percent.sample_ids().to_vec(),
            taxa: percent.taxa().to_vec(),
            attributes,
            values,
            attribute_values,
        }
    }

    /// Full header row.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.key_header.clone())
            .chain(self.taxa.iter().cloned())
            .chain(self.attributes.iter().cloned())
            .collect()
    }

    /// Number of sample rows.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Text cells of one sample row, matching [`CleanedTable::header`].
    pub fn row(&self, sample: usize) -> Vec<String> {
        std::iter::once(self.sample_ids[sample].clone())
            .chain(self.values[sample].iter().map(|&v| format_cell(v)))
            .chain(self.attribute_values[sample].iter().map(Variable::to_cell))
            .collect()
    }

    /// Write as a tab-separated file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
        writer.write_record(self.header())?;
        for i in 0..self.n_samples() {
            writer.write_record(self.row(i))?;
        }
        writer.flush()?;
        Ok(())
    }
}
