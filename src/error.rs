//! Error types for the taxon-summary library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum TaxonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid taxonomic rank '{0}': expected domain, phylum, class, order, family, genus, species or an abbreviation")]
    InvalidRank(String),

    #[error("Invalid metadata attribute '{column}': {reason}")]
    InvalidAttribute { column: String, reason: String },

    #[error("Only one of top_taxa ({top_taxa}) and threshold ({threshold}) can be selected")]
    ConflictingPolicy { top_taxa: usize, threshold: f64 },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Step {step} ({stage}) failed: {source}")]
    Stage {
        step: usize,
        stage: String,
        #[source]
        source: Box<TaxonError>,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TaxonError {
    /// Whether the error describes bad input or usage rather than a failed
    /// computation. These pass through pipeline stages unwrapped.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TaxonError::InvalidRank(_)
                | TaxonError::InvalidAttribute { .. }
                | TaxonError::ConflictingPolicy { .. }
                | TaxonError::MalformedInput(_)
                | TaxonError::MissingColumn(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_input_errors_are_classified() {
        assert!(TaxonError::MissingColumn("Treatment".into()).is_input_error());
        assert!(TaxonError::InvalidRank("strain".into()).is_input_error());
        assert!(!TaxonError::Pipeline("Must aggregate before normalizing".into()).is_input_error());
    }

    #[test]
    fn test_stage_error_keeps_source() {
        let err = TaxonError::Stage {
            step: 3,
            stage: "normalize".into(),
            source: Box::new(TaxonError::Pipeline("Must aggregate before normalizing".into())),
        };
        assert_eq!(
            err.to_string(),
            "Step 3 (normalize) failed: Pipeline error: Must aggregate before normalizing"
        );
        assert!(matches!(
            err.source().and_then(|e| e.downcast_ref::<TaxonError>()),
            Some(TaxonError::Pipeline(_))
        ));
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, TaxonError>;
