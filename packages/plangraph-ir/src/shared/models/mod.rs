//! Shared models - the serialized plan form

pub mod plan;

pub use plan::{Operation, Output, Plan};
