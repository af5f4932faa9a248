//! Error types for plan exporters
//!
//! The render model and pseudo printer are pure and cannot fail; errors
//! only arise at the file/process boundary (Graphviz, disk).

use thiserror::Error;

/// Main error type for plan export
#[derive(Debug, Error)]
pub enum ExportError {
    /// The `dot` executable is not on PATH
    #[error("graphviz 'dot' executable not found; install graphviz or run without --svg")]
    GraphvizMissing,

    /// `dot` ran but did not produce output
    #[error("dot failed: {0}")]
    DotFailed(String),

    /// Plan serialization failed
    #[error("plan serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem or pipe error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
