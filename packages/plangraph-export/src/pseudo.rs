//! Pseudo-code view
//!
//! Flattens a plan back into assignment lines for humans: settings first,
//! one line per operation with labeled dependencies and literal arguments,
//! then the output bindings. The text is diff-friendly and stable across
//! runs because it follows plan order exactly.

use plangraph_ir::{Operation, Plan};

/// Render `plan` as pseudo-code. Ends with exactly one newline.
pub fn generate(plan: &Plan) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !plan.settings.is_empty() {
        let pairs: Vec<String> = plan
            .settings
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        lines.push(format!("settings({})", pairs.join(", ")));
        lines.push(String::new());
    }

    for op in &plan.ops {
        lines.push(op_line(op));
    }

    if !plan.outputs.is_empty() {
        lines.push(String::new());
        for output in &plan.outputs {
            let label = serde_json::Value::String(output.label.clone());
            lines.push(format!("output({}, as={label})", output.from));
        }
    }

    format!("{}\n", lines.join("\n").trim_end())
}

fn op_line(op: &Operation) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (idx, dep) in op.deps.iter().enumerate() {
        let label = op.dep_labels.get(idx).map(String::as_str).unwrap_or("");
        parts.push(match label {
            "" => dep.clone(),
            "*" => format!("*{dep}"),
            "**" => format!("**{dep}"),
            keyword => format!("{keyword}={dep}"),
        });
    }
    for (key, value) in &op.args {
        parts.push(format!("{key}={value}"));
    }
    let awaited = if op.awaited { "await " } else { "" };
    format!("{} = {}{}({})", op.id, awaited, op.op, parts.join(", "))
}
