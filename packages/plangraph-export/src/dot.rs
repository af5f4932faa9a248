//! Graphviz export
//!
//! Emits DOT text for a rendered plan and, when the `dot` binary is on
//! PATH, pipes it through `dot -Tsvg`. The SVG file is only written when
//! graphviz succeeds, so a half-rendered artifact never lands on disk.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use plangraph_ir::Plan;

use crate::errors::{ExportError, Result};
use crate::render::{render, RenderGraph};

/// DOT text for `graph`. Node fill colors and note shapes come from the
/// render model; edge labels are omitted entirely when empty.
pub fn to_dot(graph: &RenderGraph) -> String {
    let mut lines: Vec<String> = vec![
        "digraph plan {".to_string(),
        "  rankdir=TB;".to_string(),
        "  node [shape=box, style=\"rounded,filled\"];".to_string(),
    ];

    for node in graph.nodes() {
        let mut attrs = format!(
            "label=\"{}\", fillcolor=\"{}\"",
            escape(&node.label),
            node.color
        );
        if node.kind == "out" {
            attrs.push_str(", shape=note");
        }
        lines.push(format!("  \"{}\" [{attrs}];", escape(&node.id)));
    }

    for edge in graph.edges() {
        let attr = if edge.label.is_empty() {
            String::new()
        } else {
            format!(" [label=\"{}\"]", escape(&edge.label))
        };
        lines.push(format!(
            "  \"{}\" -> \"{}\"{attr};",
            escape(&edge.from),
            escape(&edge.to)
        ));
    }

    lines.push("}".to_string());
    format!("{}\n", lines.join("\n"))
}

/// Render `plan` to an SVG file via the graphviz `dot` executable.
pub fn export_svg(plan: &Plan, path: &Path) -> Result<()> {
    let dot = to_dot(&render(plan));
    let svg = run_dot(&dot)?;
    fs::write(path, svg)?;
    Ok(())
}

fn run_dot(source: &str) -> Result<Vec<u8>> {
    let mut child = Command::new("dot")
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ExportError::GraphvizMissing
            } else {
                ExportError::Io(err)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(source.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(ExportError::DotFailed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(output.stdout)
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
