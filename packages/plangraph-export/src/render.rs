//! Presentation graph
//!
//! Converts a plan into a node/edge model ready for layout engines: one
//! node per operation (control ops get readable labels and a note style),
//! one node per output, and labeled dependency edges. The model never
//! reinterprets plan semantics; it only decorates them.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use serde_json::{json, Value};

use plangraph_ir::shared::models::plan::{
    OP_COMP_FOREACH, OP_COND_EVAL, OP_ITER_EVAL, OP_LOOP_EXIT, OP_PACK_DICT, OP_PHI,
};
use plangraph_ir::{Operation, Plan};

use crate::colors::{color_for, NOTE_COLOR};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    /// "op" | "note" | "out"
    pub kind: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// Layout-ready view of one plan.
pub struct RenderGraph {
    graph: DiGraph<RenderNode, RenderEdge>,
}

impl RenderGraph {
    pub fn nodes(&self) -> impl Iterator<Item = &RenderNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RenderEdge> {
        self.graph.edge_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `{nodes, edges}` JSON form, in insertion order.
    pub fn to_json(&self) -> Value {
        json!({
            "nodes": self.nodes().collect::<Vec<_>>(),
            "edges": self.edges().collect::<Vec<_>>(),
        })
    }
}

/// Build the presentation graph for `plan`.
pub fn render(plan: &Plan) -> RenderGraph {
    let mut graph = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();

    for op in &plan.ops {
        let kind = if is_note(&op.op) { "note" } else { "op" };
        let color = if kind == "note" {
            NOTE_COLOR
        } else {
            color_for(&op.op)
        };
        let ix = graph.add_node(RenderNode {
            id: op.id.clone(),
            label: node_label(op),
            kind: kind.to_string(),
            color: color.to_string(),
        });
        index.insert(op.id.clone(), ix);
    }

    for op in &plan.ops {
        let Some(&to) = index.get(&op.id) else {
            continue;
        };
        let mut seen: HashSet<&str> = HashSet::new();
        for (idx, dep) in op.deps.iter().enumerate() {
            if !seen.insert(dep.as_str()) {
                continue;
            }
            let Some(&from) = index.get(dep.as_str()) else {
                continue;
            };
            let label = edge_label(plan, op, idx, dep);
            graph.add_edge(
                from,
                to,
                RenderEdge {
                    from: dep.clone(),
                    to: op.id.clone(),
                    label,
                },
            );
        }
    }

    for output in &plan.outputs {
        let out_id = format!("out:{}", output.label);
        let to = match index.get(&out_id) {
            Some(&ix) => ix,
            None => {
                let ix = graph.add_node(RenderNode {
                    id: out_id.clone(),
                    label: output.label.clone(),
                    kind: "out".to_string(),
                    color: color_for("output").to_string(),
                });
                index.insert(out_id.clone(), ix);
                ix
            }
        };
        if let Some(&from) = index.get(&output.from) {
            graph.add_edge(
                from,
                to,
                RenderEdge {
                    from: output.from.clone(),
                    to: out_id,
                    label: String::new(),
                },
            );
        }
    }

    RenderGraph { graph }
}

fn is_note(op: &str) -> bool {
    matches!(
        op,
        OP_COND_EVAL | OP_ITER_EVAL | OP_PHI | OP_LOOP_EXIT | OP_COMP_FOREACH
    )
}

fn node_label(op: &Operation) -> String {
    match op.op.as_str() {
        OP_COND_EVAL => {
            let kind = op
                .args
                .get("kind")
                .and_then(Value::as_str)
                .unwrap_or("if");
            let expr = op
                .args
                .get("expr")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("{} {}", kind.to_uppercase(), expr)
        }
        OP_ITER_EVAL => {
            let expr = op
                .args
                .get("expr")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("FOR {expr}")
        }
        OP_PHI => match op.args.get("var").and_then(Value::as_str) {
            Some(var) => format!("PHI ({var})"),
            None => "PHI".to_string(),
        },
        _ => op.op.clone(),
    }
}

/// Label for the edge `dep -> op` (dep at position `idx`).
///
/// Explicit dep labels win; empty ones fall back to something readable:
/// the dict key for PACK.dict deps, then/else/cond for condition sources,
/// the loop target for iterate sources, and finally the dep id itself.
fn edge_label(plan: &Plan, op: &Operation, idx: usize, dep: &str) -> String {
    if let Some(label) = op.dep_labels.get(idx) {
        if !label.is_empty() {
            return label.clone();
        }
    }

    if op.op == OP_PACK_DICT {
        if let Some(key) = op
            .args
            .get("keys")
            .and_then(Value::as_array)
            .and_then(|keys| keys.get(idx))
        {
            let text = match key {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !text.is_empty() {
                return text;
            }
        }
    } else if let Some(src) = plan.op(dep) {
        if src.op == OP_COND_EVAL {
            if src.args.get("kind").and_then(Value::as_str) == Some("if") {
                if op.id.contains("@then") {
                    return "then".to_string();
                }
                if op.id.contains("@else") {
                    return "else".to_string();
                }
            }
            return "cond".to_string();
        }
        if src.op == OP_ITER_EVAL {
            return src
                .args
                .get("target")
                .and_then(Value::as_str)
                .unwrap_or("iter")
                .to_string();
        }
    }

    dep.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plangraph_ir::compile_source;
    use pretty_assertions::assert_eq;

    fn compiled(source: &str) -> Plan {
        compile_source(source, None).unwrap()
    }

    fn edge<'g>(graph: &'g RenderGraph, from: &str, to: &str) -> &'g RenderEdge {
        graph
            .edges()
            .find(|e| e.from == from && e.to == to)
            .unwrap_or_else(|| panic!("no edge {from} -> {to}"))
    }

    #[test]
    fn test_nodes_cover_ops_and_outputs() {
        let plan = compiled(
            r#"
def flow():
    a = AG.op()
    return a
"#,
        );
        let graph = render(&plan);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let out = graph.nodes().find(|n| n.kind == "out").unwrap();
        assert_eq!(out.id, "out:return");
        assert_eq!(out.label, "return");
        let e = edge(&graph, "a_1", "out:return");
        assert_eq!(e.label, "");
    }

    #[test]
    fn test_condition_edges_label_then_else() {
        let plan = compiled(
            r#"
def flow():
    a = AG.src()
    if a:
        x = AG.x(a)
    else:
        x = AG.y(a)
    return x
"#,
        );
        let graph = render(&plan);

        assert_eq!(edge(&graph, "cond_1", "x_1@then1").label, "then");
        assert_eq!(edge(&graph, "cond_1", "x_1@else1").label, "else");
        // Plain data edges fall back to the dep id.
        assert_eq!(edge(&graph, "a_1", "cond_1").label, "a_1");

        let cond = graph.nodes().find(|n| n.id == "cond_1").unwrap();
        assert_eq!(cond.label, "IF a");
        assert_eq!(cond.kind, "note");
        assert_eq!(cond.color, NOTE_COLOR);
    }

    #[test]
    fn test_iterator_edges_use_loop_target() {
        let plan = compiled(
            r#"
def flow():
    xs = AG.items()
    for x in xs:
        y = AG.probe(x)
    return xs
"#,
        );
        let graph = render(&plan);

        assert_eq!(edge(&graph, "iter_1", "x_1@loop1").label, "x");
        let iter = graph.nodes().find(|n| n.id == "iter_1").unwrap();
        assert_eq!(iter.label, "FOR xs");
    }

    #[test]
    fn test_phi_node_label_carries_var() {
        let plan = compiled(
            r#"
def flow():
    x = AG.src()
    if x:
        x = AG.bump(x)
    return x
"#,
        );
        let graph = render(&plan);
        let phi = graph.nodes().find(|n| n.label == "PHI (x)").unwrap();
        assert_eq!(phi.kind, "note");
    }

    #[test]
    fn test_dict_pack_edges_label_keys() {
        let plan = compiled(
            r#"
def flow():
    v = AG.score()
    d = {"score": v}
    return d
"#,
        );
        let graph = render(&plan);
        assert_eq!(edge(&graph, "v_1", "d_1").label, "score");
    }

    #[test]
    fn test_repeated_deps_collapse_to_one_edge() {
        let plan = compiled(
            r#"
def flow():
    user = AG.user()
    msg = f"{user} and {user}"
    return msg
"#,
        );
        let graph = render(&plan);
        let parallel = graph
            .edges()
            .filter(|e| e.from == "user_1" && e.to == "msg_1")
            .count();
        assert_eq!(parallel, 1);
    }

    #[test]
    fn test_json_form_has_nodes_and_edges() {
        let plan = compiled(
            r#"
def flow():
    a = AG.op()
    return a
"#,
        );
        let value = render(&plan).to_json();
        assert_eq!(value["nodes"][0]["id"], "a_1");
        assert_eq!(value["nodes"][0]["kind"], "op");
        assert_eq!(value["edges"][0]["from"], "a_1");
        assert_eq!(value["edges"][0]["to"], "out:return");
        // Unlabeled edges omit the field.
        assert!(value["edges"][0].get("label").is_none());
    }
}
