/*
 * Plangraph Export - plan presentation layer
 *
 * Turns compiled plans into human-facing artifacts:
 * - render/  : layout-ready node/edge model (petgraph)
 * - pseudo   : flat assignment-style text
 * - dot      : graphviz DOT source and SVG via the `dot` binary
 * - html     : self-contained dagre-d3 page
 *
 * Everything here is read-only over `plangraph_ir::Plan`; exporters never
 * mutate or reinterpret plan semantics.
 */

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Stable color assignment for node fills
pub mod colors;

/// Graphviz DOT and SVG export
pub mod dot;

/// Error types
pub mod errors;

/// Dagre HTML export
pub mod html;

/// Pseudo-code text export
pub mod pseudo;

/// Presentation graph model
pub mod render;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use colors::{color_for, CRAYON_COLORS, NOTE_COLOR};
pub use dot::{export_svg, to_dot};
pub use errors::{ExportError, Result};
pub use html::export_html;
pub use pseudo::generate;
pub use render::{render, RenderEdge, RenderGraph, RenderNode};
