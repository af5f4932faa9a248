//! Syntax feature - DSL surface recognition
//!
//! Turns tree-sitter parses of the Python-shaped DSL into a closed typed
//! AST. The reader enforces the syntactic surface (statement and expression
//! shapes, identifier rules, literal grammar); semantic checks such as name
//! resolution happen during lowering.

pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use domain::ast;
pub use infrastructure::Reader;
