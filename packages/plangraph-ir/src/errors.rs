//! Error types for plangraph-ir
//!
//! Every way a source can fail to compile is a DSL violation; the variants
//! carry the category so callers and tests can match without parsing the
//! message text.

use thiserror::Error;

/// Maximum accepted source length, in characters.
pub const MAX_SOURCE_CHARS: usize = 20_000;

/// Hard ceiling on emitted operations per plan.
pub const MAX_OPERATIONS: usize = 200;

/// Main error type for plan compilation
#[derive(Debug, Error)]
pub enum DslViolation {
    /// Source exceeds [`MAX_SOURCE_CHARS`]
    #[error("source too large: {0} characters (limit {MAX_SOURCE_CHARS})")]
    SourceTooLarge(usize),

    /// The grammar could not parse the source
    #[error("syntax error near {0:?}")]
    Syntax(String),

    /// No top-level function definitions in the source
    #[error("no function definitions found in source")]
    NoFunctions,

    /// Explicitly requested function is missing
    #[error("function {0:?} not found")]
    FunctionNotFound(String),

    /// Auto-detection tried several candidates and none compiled
    #[error("no function matched the plan grammar; pass an explicit function name (last failure: {last})")]
    NoCandidateMatched {
        #[source]
        last: Box<DslViolation>,
    },

    /// Plan functions take no parameters
    #[error("function {0:?} must take no parameters")]
    ParamsNotAllowed(String),

    /// Bound names must match `[a-z_][a-z0-9_]{0,63}`
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// Assignment target shape is not part of the DSL
    #[error("unsupported assignment target: {0}")]
    UnsupportedTarget(String),

    /// A name was referenced before any binding
    #[error("undefined dependency: {0}")]
    UndefinedDependency(String),

    /// Callee is not a plain or dotted name
    #[error("unsupported callee: {0}")]
    BadCallee(String),

    /// `*`/`**` argument has a shape the DSL cannot expand
    #[error("unsupported splat argument: {0}")]
    BadSplat(String),

    /// Value is not representable as a plan literal
    #[error("unsupported literal: {0}")]
    UnsupportedLiteral(String),

    /// Malformed settings()/output() declaration
    #[error("invalid declaration: {0}")]
    BadDeclaration(String),

    /// Return value is neither a bound name nor a literal
    #[error("unsupported return value: {0}")]
    UnsupportedReturn(String),

    /// Expression shape is not part of the DSL
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Statement shape is not part of the DSL
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    /// Emitted operations exceeded [`MAX_OPERATIONS`]
    #[error("too many operations: {0} (limit {MAX_OPERATIONS})")]
    PlanTooLarge(usize),
}

/// Result type alias for compilation
pub type Result<T> = std::result::Result<T, DslViolation>;
