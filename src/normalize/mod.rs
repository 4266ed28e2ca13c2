//! Normalization of aggregated abundances.
//!
//! - **Percent**: column-wise relative abundance scaled to 100

pub mod percent;

pub use percent::{norm_percent, norm_relative, scale};
