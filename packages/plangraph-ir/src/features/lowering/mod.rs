//! Lowering feature - AST to plan compilation
//!
//! Consumes the typed AST from the syntax feature and produces the plan:
//! the emitter lowers expressions into operations, the compiler drives
//! statements and control flow over the SSA tables, and the application
//! layer wires source text to finished plan.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::compile_source;
pub use domain::OpArena;
pub use infrastructure::{Compiler, Emitter};
