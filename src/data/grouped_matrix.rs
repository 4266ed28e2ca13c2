//! Taxon × group matrix produced by summarizing samples over a metadata attribute.

use crate::data::abundance_matrix::{check_unique, format_cell, skipna_mean};
use crate::error::{Result, TaxonError};
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Mean abundances per taxon for each level of a categorical attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedMatrix {
    /// Values (taxa × groups).
    data: DMatrix<f64>,
    /// Taxon labels in row order.
    taxa: Vec<String>,
    /// Attribute levels in column order.
    groups: Vec<String>,
    /// Name of the attribute the groups come from.
    attribute: String,
}

impl GroupedMatrix {
    /// Create a grouped matrix, checking dimensions and uniqueness.
    pub fn new(
        data: DMatrix<f64>,
        taxa: Vec<String>,
        groups: Vec<String>,
        attribute: impl Into<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != taxa.len() || ncols != groups.len() {
            return Err(TaxonError::MalformedInput(format!(
                "grouped matrix is {}x{} but has {} taxa and {} groups",
                nrows,
                ncols,
                taxa.len(),
                groups.len()
            )));
        }
        check_unique(&taxa, "taxon label")?;
        check_unique(&groups, "group")?;
        Ok(Self {
            data,
            taxa,
            groups,
            attribute: attribute.into(),
        })
    }

    /// Build from row vectors, one per taxon.
    pub fn from_rows(
        taxa: Vec<String>,
        groups: Vec<String>,
        attribute: impl Into<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let ncols = groups.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(TaxonError::MalformedInput(format!(
                "row has {} values, expected {}",
                bad.len(),
                ncols
            )));
        }
        let data = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(data, taxa, groups, attribute)
    }

    #[inline]
    pub fn get(&self, taxon: usize, group: usize) -> f64 {
        self.data[(taxon, group)]
    }

    #[inline]
    pub fn n_taxa(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    #[inline]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[inline]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn taxon_index(&self, label: &str) -> Option<usize> {
        self.taxa.iter().position(|t| t == label)
    }

    pub fn group_index(&self, group: &str) -> Option<usize> {
        self.groups.iter().position(|g| g == group)
    }

    /// A taxon's values across groups.
    pub fn row(&self, taxon: usize) -> Vec<f64> {
        self.data.row(taxon).iter().copied().collect()
    }

    /// Mean of each row across groups, skipping NaN cells.
    pub fn row_means(&self) -> Vec<f64> {
        (0..self.n_taxa())
            .map(|i| skipna_mean(self.data.row(i).iter().copied()))
            .collect()
    }

    /// Write as TSV: header `taxon_header<TAB>groups...`, one row per taxon.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, taxon_header: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "{}", taxon_header)?;
        for group in &self.groups {
            write!(writer, "\t{}", group)?;
        }
        writeln!(writer)?;

        for (i, taxon) in self.taxa.iter().enumerate() {
            write!(writer, "{}", taxon)?;
            for j in 0..self.n_groups() {
                write!(writer, "\t{}", format_cell(self.get(i, j)))?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}
