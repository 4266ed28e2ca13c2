//! How low-abundance taxa are folded into the Other row.

use crate::error::{Result, TaxonError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collapse policy, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapsePolicy {
    /// Keep every taxon, sorted by mean abundance.
    #[default]
    None,
    /// Keep the n most abundant taxa.
    TopN(usize),
    /// Keep taxa whose mean abundance is at least this value.
    Threshold(f64),
}

impl CollapsePolicy {
    /// Build a policy from the two optional user settings.
    ///
    /// At most one may be given. `top_taxa` must be positive and `threshold`
    /// must be a non-negative number.
    pub fn from_options(top_taxa: Option<usize>, threshold: Option<f64>) -> Result<Self> {
        match (top_taxa, threshold) {
            (Some(top_taxa), Some(threshold)) => Err(TaxonError::ConflictingPolicy {
                top_taxa,
                threshold,
            }),
            (Some(0), None) => Err(TaxonError::InvalidParameter(
                "top_taxa must be at least 1".to_string(),
            )),
            (Some(n), None) => Ok(CollapsePolicy::TopN(n)),
            (None, Some(t)) if t.is_nan() || t < 0.0 => Err(TaxonError::InvalidParameter(
                format!("threshold must be a non-negative number, got {}", t),
            )),
            (None, Some(t)) => Ok(CollapsePolicy::Threshold(t)),
            (None, None) => Ok(CollapsePolicy::None),
        }
    }

    /// The `(top_taxa, threshold)` pair this policy came from.
    pub fn to_options(&self) -> (Option<usize>, Option<f64>) {
        match *self {
            CollapsePolicy::None => (None, None),
            CollapsePolicy::TopN(n) => (Some(n), None),
            CollapsePolicy::Threshold(t) => (None, Some(t)),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CollapsePolicy::None)
    }
}

impl fmt::Display for CollapsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollapsePolicy::None => write!(f, "none"),
            CollapsePolicy::TopN(n) => write!(f, "top {} taxa", n),
            CollapsePolicy::Threshold(t) => write!(f, "threshold {}", t),
        }
    }
}
