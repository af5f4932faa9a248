//! Tree-sitter utility functions
//!
//! Node-level helpers shared by the syntax reader. The DSL surface is
//! Python-shaped, so the grammar is always tree-sitter-python.

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{DslViolation, Result};

/// Parse a source module, rejecting anything the grammar cannot represent.
///
/// tree-sitter is error-tolerant; a tree containing ERROR or MISSING nodes
/// means the source is not valid DSL input, so the first offending snippet
/// is surfaced as a syntax violation.
pub fn parse_module(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| DslViolation::Syntax(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DslViolation::Syntax("parser returned no tree".into()))?;

    let root = tree.root_node();
    if root.has_error() {
        let snippet = first_error_snippet(&root, source).unwrap_or_default();
        return Err(DslViolation::Syntax(snippet));
    }
    Ok(tree)
}

/// Extract text content from a node
#[inline]
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Extract text content from a node as owned String
#[inline]
pub fn node_text_owned(node: &Node, source: &str) -> String {
    node_text(node, source).to_string()
}

/// Find a direct child node by kind
#[inline]
pub fn find_child_by_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

/// Collect the named children of a node (skips punctuation/keyword tokens)
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

/// Depth-first search for the first ERROR/MISSING node, for error messages.
fn first_error_snippet(root: &Node, source: &str) -> Option<String> {
    let mut stack = vec![*root];
    while let Some(current) = stack.pop() {
        if current.is_error() || current.is_missing() {
            let text = node_text(&current, source);
            let line = current.start_position().row + 1;
            return Some(format!("line {line}: {}", text.trim()));
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
    None
}
