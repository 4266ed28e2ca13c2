//! Collapsing low-abundance taxa into the rank's Other row.

pub mod abundance;
pub mod policy;

pub use abundance::{collapse_taxa, Collapsed};
pub use policy::CollapsePolicy;
