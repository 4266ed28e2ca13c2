//! Per-group mean abundance over a categorical metadata attribute.

use crate::data::{skipna_mean, AbundanceMatrix, GroupedMatrix, Metadata, Variable};
use crate::error::{Result, TaxonError};
use log::{debug, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::HashMap;

/// Attribute values that exclude a sample from grouping.
pub const INVALID_GROUP_VALUES: [&str; 5] = ["", "Na", "NA", "#VALUE!", "#NAME?"];

/// Partition of matrix columns by attribute level.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMembership {
    /// Levels in first-seen order, each with the column indices of its samples.
    pub groups: Vec<(String, Vec<usize>)>,
    /// Samples left out: no metadata row, or a missing/invalid value.
    pub dropped: Vec<String>,
}

/// Assign each sample column to its attribute level.
///
/// Levels keep the order in which they first appear among retained samples.
pub fn group_samples(
    sample_ids: &[String],
    metadata: &Metadata,
    attribute: &str,
) -> Result<GroupMembership> {
    metadata.require_categorical(attribute)?;

    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = Vec::new();

    for (col, sid) in sample_ids.iter().enumerate() {
        let level = match metadata.get(sid, attribute).and_then(Variable::as_categorical) {
            Some(v) if !INVALID_GROUP_VALUES.contains(&v) => v,
            _ => {
                dropped.push(sid.clone());
                continue;
            }
        };
        match index.get(level) {
            Some(&g) => groups[g].1.push(col),
            None => {
                index.insert(level.to_string(), groups.len());
                groups.push((level.to_string(), vec![col]));
            }
        }
    }

    Ok(GroupMembership { groups, dropped })
}

/// Mean of each taxon's values within each attribute level.
///
/// The attribute must exist and be categorical. Cells average the non-NaN
/// values of the level's samples and are NaN when there are none.
pub fn summarize_groups(
    percent: &AbundanceMatrix,
    metadata: &Metadata,
    attribute: &str,
) -> Result<GroupedMatrix> {
    let membership = group_samples(percent.sample_ids(), metadata, attribute)?;

    if !membership.dropped.is_empty() {
        warn!(
            "Dropped {} sample(s) with no usable '{}' value: {}",
            membership.dropped.len(),
            attribute,
            membership.dropped.join(", ")
        );
    }
    if membership.groups.is_empty() {
        return Err(TaxonError::MissingColumn(format!(
            "{} (no sample matched the metadata key with a valid value)",
            attribute
        )));
    }

    let n_taxa = percent.n_taxa();
    let group_cols: Vec<Vec<f64>> = membership
        .groups
        .par_iter()
        .map(|(_, cols)| {
            (0..n_taxa)
                .map(|i| skipna_mean(cols.iter().map(|&j| percent.get(i, j))))
                .collect()
        })
        .collect();

    let n_groups = membership.groups.len();
    let data = DMatrix::from_fn(n_taxa, n_groups, |i, g| group_cols[g][i]);
    let groups: Vec<String> = membership.groups.into_iter().map(|(level, _)| level).collect();
    debug!("Summarized {} taxa over {} '{}' groups", n_taxa, n_groups, attribute);

    GroupedMatrix::new(data, percent.taxa().to_vec(), groups, attribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_metadata() -> Metadata {
        let input = "sample-id\tTreatment\tDay\n\
                     S1\tControl\t1\n\
                     S2\tTreated\t1\n\
                     S3\tControl\t2\n\
                     S4\tNa\t2\n\
                     S5\t#NAME?\t3\n\
                     S6\t\t3\n";
        Metadata::from_reader(input.as_bytes(), b'\t').unwrap()
    }

    #[test]
    fn test_group_means() {
        let percent = AbundanceMatrix::from_rows(
            vec!["Bacilli".into()],
            vec!["S1".into(), "S3".into(), "S2".into()],
            &[vec![10.0, 20.0, 30.0]],
        )
        .unwrap();
        let grouped = summarize_groups(&percent, &create_test_metadata(), "Treatment").unwrap();

        assert_eq!(grouped.groups(), &["Control", "Treated"]);
        assert_relative_eq!(grouped.get(0, 0), 15.0);
        assert_relative_eq!(grouped.get(0, 1), 30.0);
        assert_eq!(grouped.attribute(), "Treatment");
    }

    #[test]
    fn test_first_seen_group_order() {
        let percent = AbundanceMatrix::from_rows(
            vec!["Bacilli".into()],
            vec!["S2".into(), "S1".into(), "S3".into()],
            &[vec![1.0, 2.0, 3.0]],
        )
        .unwrap();
        let grouped = summarize_groups(&percent, &create_test_metadata(), "Treatment").unwrap();

        // "Treated" is seen first even though it sorts after "Control".
        assert_eq!(grouped.groups(), &["Treated", "Control"]);
    }

    #[test]
    fn test_invalid_values_and_unknown_samples_dropped() {
        let ids: Vec<String> = ["S1", "S4", "S5", "S6", "S7"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let membership = group_samples(&ids, &create_test_metadata(), "Treatment").unwrap();

        assert_eq!(membership.groups, vec![("Control".to_string(), vec![0])]);
        assert_eq!(membership.dropped, vec!["S4", "S5", "S6", "S7"]);
    }

    #[test]
    fn test_nan_cells_ignored_in_mean() {
        let percent = AbundanceMatrix::from_rows(
            vec!["Bacilli".into(), "Clostridia".into()],
            vec!["S1".into(), "S3".into(), "S2".into()],
            &[
                vec![f64::NAN, 20.0, f64::NAN],
                vec![f64::NAN, f64::NAN, 5.0],
            ],
        )
        .unwrap();
        let grouped = summarize_groups(&percent, &create_test_metadata(), "Treatment").unwrap();

        assert_relative_eq!(grouped.get(0, 0), 20.0);
        assert!(grouped.get(0, 1).is_nan());
        assert!(grouped.get(1, 0).is_nan());
        assert_relative_eq!(grouped.get(1, 1), 5.0);
    }

    #[test]
    fn test_attribute_must_be_categorical() {
        let percent = AbundanceMatrix::from_rows(
            vec!["Bacilli".into()],
            vec!["S1".into()],
            &[vec![100.0]],
        )
        .unwrap();
        let metadata = create_test_metadata();

        assert!(matches!(
            summarize_groups(&percent, &metadata, "Day"),
            Err(TaxonError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            summarize_groups(&percent, &metadata, "Site"),
            Err(TaxonError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_no_matching_samples() {
        let percent = AbundanceMatrix::from_rows(
            vec!["Bacilli".into()],
            vec!["X1".into(), "S4".into()],
            &[vec![50.0, 50.0]],
        )
        .unwrap();
        assert!(matches!(
            summarize_groups(&percent, &create_test_metadata(), "Treatment"),
            Err(TaxonError::MissingColumn(_))
        ));
    }
}
