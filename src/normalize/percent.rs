//! Column-wise relative abundance.
//!
//! Each sample column is divided by its own total and multiplied by a scale
//! factor, 100 for percentages. A column whose total is zero has no defined
//! composition; its cells become NaN rather than zero.

use crate::data::{skipna_sum, AbundanceMatrix};
use crate::error::{Result, TaxonError};
use log::{debug, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Common scale factors.
pub mod scale {
    /// Proportions (sum to 1.0 per sample).
    pub const PROPORTION: f64 = 1.0;
    /// Percentages (sum to 100 per sample).
    pub const PERCENT: f64 = 100.0;
}

/// Rescale every column of `counts` to sum to `scale_factor`.
///
/// NaN cells are skipped when totalling and stay NaN. Zero-total columns
/// become all NaN.
///
/// # Formula
/// For sample j: x_ij / sum(x_j) * scale_factor
pub fn norm_relative(counts: &AbundanceMatrix, scale_factor: f64) -> Result<AbundanceMatrix> {
    let n_taxa = counts.n_taxa();
    let n_samples = counts.n_samples();

    if n_taxa == 0 || n_samples == 0 {
        return Err(TaxonError::MalformedInput(
            "cannot normalize an empty matrix".to_string(),
        ));
    }
    if scale_factor <= 0.0 || !scale_factor.is_finite() {
        return Err(TaxonError::InvalidParameter(
            "Scale factor must be positive".to_string(),
        ));
    }

    let totals: Vec<f64> = (0..n_samples)
        .into_par_iter()
        .map(|j| skipna_sum(counts.matrix().column(j).iter().copied()))
        .collect();

    let zero_total: Vec<&str> = totals
        .iter()
        .zip(counts.sample_ids())
        .filter(|(&t, _)| t == 0.0)
        .map(|(_, s)| s.as_str())
        .collect();
    if !zero_total.is_empty() {
        warn!(
            "{} sample(s) have zero total abundance and normalize to NaN: {}",
            zero_total.len(),
            zero_total.join(", ")
        );
    }

    let normalized_cols: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            let total = totals[j];
            (0..n_taxa)
                .map(|i| {
                    if total == 0.0 {
                        f64::NAN
                    } else {
                        counts.get(i, j) / total * scale_factor
                    }
                })
                .collect()
        })
        .collect();

    let data = DMatrix::from_fn(n_taxa, n_samples, |i, j| normalized_cols[j][i]);
    debug!("Normalized {} taxa x {} samples (scale {})", n_taxa, n_samples, scale_factor);

    AbundanceMatrix::new(data, counts.taxa().to_vec(), counts.sample_ids().to_vec())
}

/// Convert absolute counts to per-sample percentages.
pub fn norm_percent(counts: &AbundanceMatrix) -> Result<AbundanceMatrix> {
    norm_relative(counts, scale::PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_counts() -> AbundanceMatrix {
        // 3 taxa × 4 samples, every sample split 50/30/20
        AbundanceMatrix::from_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()],
            &[
                vec![50.0, 100.0, 25.0, 500.0],
                vec![30.0, 60.0, 15.0, 300.0],
                vec![20.0, 40.0, 10.0, 200.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_percentages() {
        let pct = norm_percent(&create_test_counts()).unwrap();

        for j in 0..4 {
            assert_relative_eq!(pct.get(0, j), 50.0, epsilon = 1e-10);
            assert_relative_eq!(pct.get(1, j), 30.0, epsilon = 1e-10);
            assert_relative_eq!(pct.get(2, j), 20.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_columns_sum_to_100() {
        let counts = AbundanceMatrix::from_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["S1".into(), "S2".into()],
            &[vec![1.0, 7.0], vec![1.0, 13.0], vec![1.0, 0.5]],
        )
        .unwrap();
        let pct = norm_percent(&counts).unwrap();

        for sum in pct.col_sums() {
            assert_relative_eq!(sum, 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_proportions() {
        let prop = norm_relative(&create_test_counts(), scale::PROPORTION).unwrap();
        assert_relative_eq!(prop.get(0, 0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_column_becomes_nan() {
        let counts = AbundanceMatrix::from_rows(
            vec!["A".into(), "B".into()],
            vec!["S1".into(), "S2".into()],
            &[vec![10.0, 0.0], vec![10.0, 0.0]],
        )
        .unwrap();
        let pct = norm_percent(&counts).unwrap();

        assert_relative_eq!(pct.get(0, 0), 50.0, epsilon = 1e-12);
        assert!(pct.get(0, 1).is_nan());
        assert!(pct.get(1, 1).is_nan());
    }

    #[test]
    fn test_nan_cells_are_skipped() {
        let counts = AbundanceMatrix::from_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["S1".into()],
            &[vec![1.0], vec![f64::NAN], vec![3.0]],
        )
        .unwrap();
        let pct = norm_percent(&counts).unwrap();

        assert_relative_eq!(pct.get(0, 0), 25.0, epsilon = 1e-12);
        assert!(pct.get(1, 0).is_nan());
        assert_relative_eq!(pct.get(2, 0), 75.0, epsilon = 1e-12);
    }

    #[test]
    fn test_labels_preserved() {
        let counts = create_test_counts();
        let pct = norm_percent(&counts).unwrap();
        assert_eq!(pct.taxa(), counts.taxa());
        assert_eq!(pct.sample_ids(), counts.sample_ids());
    }

    #[test]
    fn test_invalid_scale_factor() {
        let counts = create_test_counts();
        assert!(norm_relative(&counts, 0.0).is_err());
        assert!(norm_relative(&counts, -1.0).is_err());
    }
}
