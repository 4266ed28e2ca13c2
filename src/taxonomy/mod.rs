//! Lineage resolution and per-rank aggregation.

pub mod aggregate;
pub mod lineage;

pub use aggregate::{
    aggregate_taxa, is_unresolved_label, resolve_and_aggregate, Aggregation, CoercedCell,
    CoercionReport,
};
pub use lineage::{placeholder_label, LineageResolver, PlaceholderSerial};
