/*
 * Plangraph IR - DSL-to-dependency-graph compiler
 *
 * Feature-First Hexagonal Architecture:
 * - shared/   : Common models (Plan, Operation, Output)
 * - features/ : Vertical slices (syntax → ssa → lowering)
 *
 * The input surface is a Python-shaped DSL: one zero-parameter function
 * whose body is read statically (never executed) and compiled into a
 * versioned dependency graph. Operation ids are SSA names (`x_1`,
 * `x_2@then1`), control flow becomes condition/iterator nodes plus PHI
 * joins, and the result serializes as deterministic plan JSON.
 */

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (compilation stages)
pub mod features;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use errors::{DslViolation, Result, MAX_OPERATIONS, MAX_SOURCE_CHARS};
pub use features::lowering::compile_source;
pub use shared::models::plan::{Operation, Output, Plan, PLAN_VERSION};
