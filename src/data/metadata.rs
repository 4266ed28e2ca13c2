//! Sample metadata keyed by sample identifier.

use crate::data::raw_table::{delimiter_for, read_records};
use crate::error::{Result, TaxonError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Accepted names for the key column, compared trimmed and lower-cased.
pub const SAMPLE_KEY_HEADERS: [&str; 7] = [
    "id",
    "sampleid",
    "sample id",
    "sample-id",
    "featureid",
    "feature id",
    "feature-id",
];

/// Cell texts read as missing when loading.
const MISSING_MARKERS: [&str; 11] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Text level.
    Categorical(String),
    /// Numeric value.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Text form for table output; missing values render empty.
    pub fn to_cell(&self) -> String {
        match self {
            Variable::Categorical(s) => s.clone(),
            Variable::Continuous(v) => v.to_string(),
            Variable::Missing => String::new(),
        }
    }
}

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Sample metadata: one row per sample, keyed by the first column.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Header of the key column, kept verbatim.
    key_header: String,
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Attribute names (excluding the key column).
    column_names: Vec<String>,
    /// sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Build metadata from a header row and text rows.
    ///
    /// The first header must name the sample key (see [`SAMPLE_KEY_HEADERS`]).
    /// Columns are inferred as continuous when every non-missing value parses
    /// as a number, otherwise categorical.
    pub fn from_records(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let key_header = header
            .first()
            .cloned()
            .ok_or_else(|| TaxonError::MalformedInput("metadata has no header".to_string()))?;
        if !is_sample_key_header(&key_header) {
            return Err(TaxonError::MalformedInput(format!(
                "first metadata header '{}' is not a sample id header (expected one of: {})",
                key_header,
                SAMPLE_KEY_HEADERS.join(", ")
            )));
        }
        let column_names: Vec<String> = header[1..].to_vec();

        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        let mut seen = HashSet::new();
        for (i, fields) in rows.into_iter().enumerate() {
            let sample_id = fields.first().map(|s| s.trim().to_string()).unwrap_or_default();
            if sample_id.is_empty() {
                return Err(TaxonError::MalformedInput(format!(
                    "metadata row {} has no sample id",
                    i + 1
                )));
            }
            if !seen.insert(sample_id.clone()) {
                return Err(TaxonError::MalformedInput(format!(
                    "duplicate sample id '{}' in metadata",
                    sample_id
                )));
            }
            let values: Vec<String> = fields.into_iter().skip(1).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(TaxonError::MalformedInput("no samples in metadata".to_string()));
        }

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = raw_data.iter().all(|(_, values)| match values.get(col_idx) {
                None => true,
                Some(v) => is_missing(v) || v.trim().parse::<f64>().is_ok(),
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::with_capacity(raw_data.len());
        let mut data = HashMap::with_capacity(raw_data.len());
        for (sample_id, values) in raw_data {
            let mut sample_data = HashMap::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx) {
                    Some(raw) if !is_missing(raw) => {
                        let raw = raw.trim();
                        match column_types.get(col_name) {
                            Some(VariableType::Continuous) => raw
                                .parse::<f64>()
                                .map(Variable::Continuous)
                                .unwrap_or(Variable::Missing),
                            Some(VariableType::Categorical) | None => {
                                Variable::Categorical(raw.to_string())
                            }
                        }
                    }
                    _ => Variable::Missing,
                };
                sample_data.insert(col_name.clone(), var);
            }
            sample_ids.push(sample_id.clone());
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            key_header,
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Load metadata from a CSV/TSV file, picking the delimiter from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let delimiter = delimiter_for(&path)?;
        let file = File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    /// Load metadata from any reader with an explicit delimiter.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let (header, rows) = read_records(reader, delimiter)?;
        Self::from_records(header, rows)
    }

    /// Header of the sample key column, verbatim.
    pub fn key_header(&self) -> &str {
        &self.key_header
    }

    /// All header names, key column first.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.key_header.clone())
            .chain(self.column_names.iter().cloned())
            .collect()
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Attribute names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get the inferred type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Check that `column` exists and holds categorical text.
    pub fn require_categorical(&self, column: &str) -> Result<()> {
        match self.column_type(column) {
            None => Err(TaxonError::InvalidAttribute {
                column: column.to_string(),
                reason: "not present in the metadata".to_string(),
            }),
            Some(VariableType::Continuous) => Err(TaxonError::InvalidAttribute {
                column: column.to_string(),
                reason: "values are numeric, a categorical attribute is required".to_string(),
            }),
            Some(VariableType::Categorical) => Ok(()),
        }
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }
}

/// Whether a header names the sample key column.
pub fn is_sample_key_header(header: &str) -> bool {
    let normalized = header.trim().to_lowercase();
    SAMPLE_KEY_HEADERS.contains(&normalized.as_str())
}

fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn create_test_tsv() -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "sample-id\tgroup\tage\tsite").unwrap();
        writeln!(file, "S1\tcontrol\t25\tgut").unwrap();
        writeln!(file, "S2\ttreatment\t30\tNa").unwrap();
        writeln!(file, "S3\tcontrol\tNA\t#VALUE!").unwrap();
        writeln!(file, "S4\ttreatment\t28\t").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_path(file.path()).unwrap();

        assert_eq!(meta.key_header(), "sample-id");
        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.sample_ids(), &["S1", "S2", "S3", "S4"]);
        assert_eq!(meta.column_names(), &["group", "age", "site"]);
        assert_eq!(meta.header()[0], "sample-id");
    }

    #[test]
    fn test_column_type_inference() {
        let file = create_test_tsv();
        let meta = Metadata::from_path(file.path()).unwrap();

        assert_eq!(meta.column_type("group"), Some(VariableType::Categorical));
        assert_eq!(meta.column_type("age"), Some(VariableType::Continuous));
        assert_eq!(meta.column_type("site"), Some(VariableType::Categorical));
        assert_eq!(meta.get("S2", "age"), Some(&Variable::Continuous(30.0)));
        assert_eq!(meta.get("S3", "age"), Some(&Variable::Missing));
    }

    #[test]
    fn test_invalid_markers_stay_categorical() {
        let file = create_test_tsv();
        let meta = Metadata::from_path(file.path()).unwrap();

        assert_eq!(meta.get("S2", "site").unwrap().as_categorical(), Some("Na"));
        assert_eq!(meta.get("S3", "site").unwrap().as_categorical(), Some("#VALUE!"));
        assert_eq!(meta.get("S4", "site"), Some(&Variable::Missing));
    }

    #[test]
    fn test_require_categorical() {
        let file = create_test_tsv();
        let meta = Metadata::from_path(file.path()).unwrap();

        assert!(meta.require_categorical("group").is_ok());
        assert!(matches!(
            meta.require_categorical("age"),
            Err(TaxonError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            meta.require_categorical("nope"),
            Err(TaxonError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_key_header_validation() {
        assert!(is_sample_key_header(" SampleID "));
        assert!(is_sample_key_header("Feature ID"));
        assert!(!is_sample_key_header("sample"));

        let input = "name,group\nS1,a\n";
        assert!(matches!(
            Metadata::from_reader(input.as_bytes(), b','),
            Err(TaxonError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_duplicate_sample_rejected() {
        let input = "id,group\nS1,a\nS1,b\n";
        assert!(matches!(
            Metadata::from_reader(input.as_bytes(), b','),
            Err(TaxonError::MalformedInput(_))
        ));
    }
}
