//! SSA feature - single static assignment bookkeeping
//!
//! Every binding in a plan gets a versioned id (`x_1`, `x_2@then1`, ...).
//! This feature owns the variable table that mints those ids, the fork
//! mechanics used when control flow splits, and the scope-tag ordinals
//! that keep forked ids globally unique.

pub mod domain;

// Re-exports for convenience
pub use domain::{ScopeTags, VariableTable};
