//! Feature modules - each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/         - Pure logic (no external dependencies)
//! - application/    - Use cases
//! - infrastructure/ - External dependency implementations
//!
//! Compilation runs syntax → ssa → lowering.

pub mod lowering;
pub mod ssa;
pub mod syntax;
