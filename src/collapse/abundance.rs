//! Rank taxa by mean group abundance and fold the tail into Other.

use crate::collapse::policy::CollapsePolicy;
use crate::data::{skipna_sum, GroupedMatrix, Rank};
use crate::error::Result;
use log::debug;
use std::cmp::Ordering;

/// A collapsed matrix plus the ranking that produced it.
#[derive(Debug, Clone)]
pub struct Collapsed {
    /// Kept taxa in descending mean order, then the Other row if any.
    pub matrix: GroupedMatrix,
    /// `(taxon, row average)` for every ranked row, in sorted order. The
    /// rank's existing Other bucket is not ranked.
    pub row_averages: Vec<(String, f64)>,
    /// Ranked rows merged into the Other row.
    pub n_collapsed: usize,
    /// Rows with no defined average, left out under a threshold policy.
    pub n_undefined: usize,
}

/// Descending by value, NaN last.
fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Sort taxa by their mean across groups and apply `policy`.
///
/// The sort is stable, so taxa with equal means keep their input order. A row
/// already labelled with the rank's Other bucket (unresolved lineages) is not
/// ranked: it always comes last, with the collapsed rows added into it.
///
/// - `TopN(n)` keeps the n highest ranked rows.
/// - `Threshold(t)` keeps rows whose mean is at least `t`. Rows with no
///   defined mean are neither kept nor collapsed.
///
/// The Other row holds the column-wise NaN-skipping sum of the collapsed rows
/// and the existing bucket. It is absent when neither exists.
pub fn collapse_taxa(
    grouped: &GroupedMatrix,
    policy: &CollapsePolicy,
    rank: Rank,
) -> Result<Collapsed> {
    let other = rank.other_bucket_name();
    let bucket = grouped.taxon_index(other);
    let averages = grouped.row_means();

    let mut order: Vec<usize> = (0..grouped.n_taxa())
        .filter(|&i| Some(i) != bucket)
        .collect();
    order.sort_by(|&a, &b| descending_nan_last(averages[a], averages[b]));

    let mut n_undefined = 0;
    let (kept, tail): (Vec<usize>, Vec<usize>) = match *policy {
        CollapsePolicy::None => (order.clone(), Vec::new()),
        CollapsePolicy::TopN(n) => {
            let split = n.min(order.len());
            (order[..split].to_vec(), order[split..].to_vec())
        }
        CollapsePolicy::Threshold(t) => {
            let defined: Vec<usize> = order
                .iter()
                .copied()
                .filter(|&i| !averages[i].is_nan())
                .collect();
            n_undefined = order.len() - defined.len();
            defined.into_iter().partition(|&i| averages[i] >= t)
        }
    };

    let mut taxa: Vec<String> = kept.iter().map(|&i| grouped.taxa()[i].clone()).collect();
    let mut rows: Vec<Vec<f64>> = kept.iter().map(|&i| grouped.row(i)).collect();

    let merged: Vec<usize> = tail.iter().copied().chain(bucket).collect();
    if !merged.is_empty() {
        let other_row = (0..grouped.n_groups())
            .map(|g| skipna_sum(merged.iter().map(|&i| grouped.get(i, g))))
            .collect();
        taxa.push(other.to_string());
        rows.push(other_row);
    }

    if n_undefined > 0 {
        debug!("Left out {} taxa with no defined mean abundance", n_undefined);
    }
    debug!(
        "Collapse ({}): kept {} of {} ranked taxa, {} folded into {}",
        policy,
        kept.len(),
        order.len(),
        tail.len(),
        other
    );

    let matrix = GroupedMatrix::from_rows(
        taxa,
        grouped.groups().to_vec(),
        grouped.attribute(),
        &rows,
    )?;
    let row_averages = order
        .iter()
        .map(|&i| (grouped.taxa()[i].clone(), averages[i]))
        .collect();

    Ok(Collapsed {
        matrix,
        row_averages,
        n_collapsed: tail.len(),
        n_undefined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grouped(taxa: &[&str], rows: &[Vec<f64>]) -> GroupedMatrix {
        GroupedMatrix::from_rows(
            taxa.iter().map(|t| t.to_string()).collect(),
            vec!["Control".into(), "Treated".into()],
            "Treatment",
            rows,
        )
        .unwrap()
    }

    /// Row averages 15, 50, 5, 30 in input order.
    fn create_test_grouped() -> GroupedMatrix {
        grouped(
            &["Alpha", "Beta", "Gamma", "Delta"],
            &[
                vec![10.0, 20.0],
                vec![40.0, 60.0],
                vec![4.0, 6.0],
                vec![30.0, 30.0],
            ],
        )
    }

    #[test]
    fn test_none_sorts_only() {
        let out = collapse_taxa(&create_test_grouped(), &CollapsePolicy::None, Rank::Genus).unwrap();
        assert_eq!(out.matrix.taxa(), &["Beta", "Delta", "Alpha", "Gamma"]);
        assert_eq!(out.n_collapsed, 0);
        assert_relative_eq!(out.row_averages[0].1, 50.0);
    }

    #[test]
    fn test_top_n_keeps_head_and_sums_tail() {
        let out =
            collapse_taxa(&create_test_grouped(), &CollapsePolicy::TopN(2), Rank::Genus).unwrap();
        let m = &out.matrix;

        assert_eq!(m.taxa(), &["Beta", "Delta", "Other_genera"]);
        assert_eq!(m.row(2), vec![14.0, 26.0]);
        assert_eq!(out.n_collapsed, 2);
    }

    #[test]
    fn test_top_n_larger_than_rows() {
        let input = create_test_grouped();
        for n in [4, 10] {
            let out = collapse_taxa(&input, &CollapsePolicy::TopN(n), Rank::Genus).unwrap();
            assert_eq!(out.matrix.n_taxa(), 4);
            assert!(out.matrix.taxon_index("Other_genera").is_none());
        }
    }

    #[test]
    fn test_threshold() {
        let input = create_test_grouped();
        let out = collapse_taxa(&input, &CollapsePolicy::Threshold(15.0), Rank::Genus).unwrap();
        let m = &out.matrix;

        // 15 is kept: the comparison is >=.
        assert_eq!(m.taxa(), &["Beta", "Delta", "Alpha", "Other_genera"]);
        assert_eq!(m.row(3), vec![4.0, 6.0]);
        for (_, avg) in out.row_averages.iter().take(3) {
            assert!(*avg >= 15.0);
        }
    }

    #[test]
    fn test_threshold_nothing_below() {
        let out = collapse_taxa(&create_test_grouped(), &CollapsePolicy::Threshold(0.0), Rank::Genus)
            .unwrap();
        assert_eq!(out.matrix.n_taxa(), 4);
        assert_eq!(out.n_collapsed, 0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input = grouped(
            &["Zeta", "Alpha", "Mu"],
            &[vec![5.0, 5.0], vec![5.0, 5.0], vec![9.0, 1.0]],
        );
        let out = collapse_taxa(&input, &CollapsePolicy::None, Rank::Class).unwrap();
        assert_eq!(out.matrix.taxa(), &["Zeta", "Alpha", "Mu"]);

        let out = collapse_taxa(&input, &CollapsePolicy::TopN(1), Rank::Class).unwrap();
        assert_eq!(out.matrix.taxa(), &["Zeta", "Other_classes"]);
    }

    #[test]
    fn test_nan_rows() {
        let input = grouped(
            &["Empty", "Half", "Full"],
            &[
                vec![f64::NAN, f64::NAN],
                vec![f64::NAN, 8.0],
                vec![2.0, 4.0],
            ],
        );

        let out = collapse_taxa(&input, &CollapsePolicy::None, Rank::Genus).unwrap();
        assert_eq!(out.matrix.taxa(), &["Half", "Full", "Empty"]);

        let out = collapse_taxa(&input, &CollapsePolicy::TopN(2), Rank::Genus).unwrap();
        assert_eq!(out.matrix.taxa(), &["Half", "Full", "Other_genera"]);
        assert_eq!(out.matrix.row(2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_threshold_leaves_out_undefined_rows() {
        let input = grouped(
            &["A", "B", "Empty"],
            &[
                vec![60.0, 60.0],
                vec![40.0, 40.0],
                vec![f64::NAN, f64::NAN],
            ],
        );
        let out = collapse_taxa(&input, &CollapsePolicy::Threshold(1.0), Rank::Genus).unwrap();

        // Nothing has a mean below 1, so no Other row is added.
        assert_eq!(out.matrix.taxa(), &["A", "B"]);
        assert_eq!(out.n_collapsed, 0);
        assert_eq!(out.n_undefined, 1);
    }

    #[test]
    fn test_top_n_ranks_around_existing_other() {
        let input = grouped(
            &["Big", "Other_genera", "Mid", "Small"],
            &[
                vec![60.0, 60.0],
                vec![20.0, 20.0],
                vec![15.0, 15.0],
                vec![5.0, 5.0],
            ],
        );
        let out = collapse_taxa(&input, &CollapsePolicy::TopN(2), Rank::Genus).unwrap();
        let m = &out.matrix;

        assert_eq!(m.taxa(), &["Big", "Mid", "Other_genera"]);
        assert_eq!(m.row(2), vec![25.0, 25.0]);
        assert_eq!(out.n_collapsed, 1);
        assert!(out.row_averages.iter().all(|(t, _)| t != "Other_genera"));
    }

    #[test]
    fn test_threshold_keeps_rows_above_existing_other() {
        let input = grouped(
            &["Big", "Other_genera", "Small"],
            &[vec![60.0, 60.0], vec![30.0, 30.0], vec![10.0, 10.0]],
        );
        let out = collapse_taxa(&input, &CollapsePolicy::Threshold(20.0), Rank::Genus).unwrap();
        let m = &out.matrix;

        // Only Small is below 20; the unresolved bucket is carried in Other.
        assert_eq!(m.taxa(), &["Big", "Other_genera"]);
        assert_eq!(m.row(1), vec![40.0, 40.0]);
        assert_eq!(out.n_collapsed, 1);
    }

    #[test]
    fn test_existing_other_goes_last_without_tail() {
        let input = grouped(
            &["Other_genera", "Big", "Small"],
            &[vec![70.0, 70.0], vec![20.0, 20.0], vec![10.0, 10.0]],
        );
        let out = collapse_taxa(&input, &CollapsePolicy::None, Rank::Genus).unwrap();
        assert_eq!(out.matrix.taxa(), &["Big", "Small", "Other_genera"]);
        assert_eq!(out.matrix.row(2), vec![70.0, 70.0]);

        let out = collapse_taxa(&input, &CollapsePolicy::TopN(5), Rank::Genus).unwrap();
        assert_eq!(out.matrix.n_taxa(), 3);
        assert_eq!(out.n_collapsed, 0);
    }

    #[test]
    fn test_groups_and_attribute_preserved() {
        let input = create_test_grouped();
        let out = collapse_taxa(&input, &CollapsePolicy::TopN(1), Rank::Genus).unwrap();
        assert_eq!(out.matrix.groups(), input.groups());
        assert_eq!(out.matrix.attribute(), "Treatment");
    }
}
