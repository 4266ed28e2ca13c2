//! Sample-to-group summaries.

pub mod group;

pub use group::{group_samples, summarize_groups, GroupMembership, INVALID_GROUP_VALUES};
