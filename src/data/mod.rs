//! Data structures for taxonomy-aware abundance summaries.

mod abundance_matrix;
mod cleaned;
mod grouped_matrix;
mod metadata;
mod rank;
mod raw_table;
mod tidy;

pub(crate) use abundance_matrix::{skipna_mean, skipna_sum};

pub use abundance_matrix::AbundanceMatrix;
pub use cleaned::CleanedTable;
pub use grouped_matrix::GroupedMatrix;
pub use metadata::{is_sample_key_header, Metadata, Variable, VariableType, SAMPLE_KEY_HEADERS};
pub use rank::Rank;
pub use raw_table::{delimiter_for, RawAbundanceTable, RawRow, TableOrientation};
pub use tidy::{TidyRecord, TidyTable, Y_AXIS_LABEL};
