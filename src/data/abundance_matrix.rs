//! Dense taxon × sample abundance matrix.

use crate::error::{Result, TaxonError};
use nalgebra::DMatrix;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sum of the non-NaN values; zero when every value is NaN.
pub(crate) fn skipna_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

/// Mean of the non-NaN values; NaN when there are none.
pub(crate) fn skipna_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

pub(crate) fn check_unique(ids: &[String], what: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(TaxonError::MalformedInput(format!("duplicate {} '{}'", what, id)));
        }
    }
    Ok(())
}

/// Format a cell for table output; NaN renders empty.
pub(crate) fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Abundances with one row per resolved taxon and one column per sample.
///
/// Cells are absolute counts after aggregation or percentages after
/// normalization. NaN marks an undefined cell.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceMatrix {
    data: DMatrix<f64>,
    taxa: Vec<String>,
    sample_ids: Vec<String>,
}

impl AbundanceMatrix {
    /// Create a matrix, checking dimensions and label uniqueness.
    pub fn new(data: DMatrix<f64>, taxa: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != taxa.len() || ncols != sample_ids.len() {
            return Err(TaxonError::MalformedInput(format!(
                "matrix is {}x{} but has {} taxa and {} samples",
                nrows,
                ncols,
                taxa.len(),
                sample_ids.len()
            )));
        }
        check_unique(&taxa, "taxon label")?;
        check_unique(&sample_ids, "sample id")?;
        Ok(Self {
            data,
            taxa,
            sample_ids,
        })
    }

    /// Build from row vectors, one per taxon.
    pub fn from_rows(taxa: Vec<String>, sample_ids: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let ncols = sample_ids.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(TaxonError::MalformedInput(format!(
                "row has {} values, expected {}",
                bad.len(),
                ncols
            )));
        }
        let data = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(data, taxa, sample_ids)
    }

    /// Get the value at (taxon, sample).
    #[inline]
    pub fn get(&self, taxon: usize, sample: usize) -> f64 {
        self.data[(taxon, sample)]
    }

    /// Number of taxa (rows).
    #[inline]
    pub fn n_taxa(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Taxon labels in row order.
    #[inline]
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    /// Sample identifiers in column order.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Underlying dense matrix.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Row index of a taxon label.
    pub fn taxon_index(&self, label: &str) -> Option<usize> {
        self.taxa.iter().position(|t| t == label)
    }

    /// Column index of a sample.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// A taxon's values across samples.
    pub fn row(&self, taxon: usize) -> Vec<f64> {
        self.data.row(taxon).iter().copied().collect()
    }

    /// A sample's values across taxa.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().copied().collect()
    }

    /// Column totals, skipping NaN cells.
    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.n_samples())
            .map(|j| skipna_sum(self.data.column(j).iter().copied()))
            .collect()
    }

    /// Write as TSV: header `taxon_header<TAB>samples...`, one row per taxon.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, taxon_header: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "{}", taxon_header)?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (i, taxon) in self.taxa.iter().enumerate() {
            write!(writer, "{}", taxon)?;
            for j in 0..self.n_samples() {
                write!(writer, "\t{}", format_cell(self.get(i, j)))?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> AbundanceMatrix {
        AbundanceMatrix::from_rows(
            vec!["Bacilli".into(), "Clostridia".into()],
            vec!["A".into(), "B".into(), "C".into()],
            &[vec![5.0, 5.0, f64::NAN], vec![1.0, 0.0, 2.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_lookup() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_taxa(), 2);
        assert_eq!(mat.n_samples(), 3);
        assert_eq!(mat.taxon_index("Clostridia"), Some(1));
        assert_eq!(mat.sample_index("C"), Some(2));
        assert_eq!(mat.row(1), vec![1.0, 0.0, 2.0]);
        assert_eq!(mat.col(0), vec![5.0, 1.0]);
    }

    #[test]
    fn test_col_sums_skip_nan() {
        let mat = create_test_matrix();
        assert_eq!(mat.col_sums(), vec![6.0, 5.0, 2.0]);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let result = AbundanceMatrix::from_rows(
            vec!["X".into(), "X".into()],
            vec!["A".into()],
            &[vec![1.0], vec![2.0]],
        );
        assert!(matches!(result, Err(TaxonError::MalformedInput(_))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = AbundanceMatrix::new(
            DMatrix::zeros(2, 2),
            vec!["X".into()],
            vec!["A".into(), "B".into()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_skipna_helpers() {
        assert_eq!(skipna_sum([1.0, f64::NAN, 2.0]), 3.0);
        assert_eq!(skipna_sum([f64::NAN]), 0.0);
        assert_eq!(skipna_mean([10.0, f64::NAN, 20.0]), 15.0);
        assert!(skipna_mean([f64::NAN, f64::NAN]).is_nan());
        assert!(skipna_mean(Vec::<f64>::new()).is_nan());
    }

    #[test]
    fn test_to_tsv() {
        let mat = create_test_matrix();
        let mut file = NamedTempFile::new().unwrap();
        mat.to_tsv(file.path(), "Taxa").unwrap();

        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Taxa\tA\tB\tC");
        assert_eq!(lines[1], "Bacilli\t5\t5\t");
        assert_eq!(lines[2], "Clostridia\t1\t0\t2");
    }
}
