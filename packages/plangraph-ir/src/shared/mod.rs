//! Shared module - common types and utilities
//!
//! Types shared across all features. Only the plan model here is public
//! API; the utils are crate plumbing.

pub mod models;
pub mod utils;

// Re-exports for convenience
pub use models::plan::{Operation, Output, Plan};
