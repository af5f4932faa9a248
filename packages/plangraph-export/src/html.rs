//! Dagre HTML export
//!
//! Writes a self-contained page that renders the plan with dagre-d3 loaded
//! from a CDN. The plan JSON and the op color map are injected into the
//! template, so the page needs no companion artifacts and degrades to a
//! plain JSON dump when the CDN assets fail to load.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use plangraph_ir::Plan;

use crate::colors::color_for;
use crate::errors::Result;

const TEMPLATE: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Plangraph Plan</title>
  <style>
    body { font-family: -apple-system, BlinkMacSystemFont, Segoe UI, Roboto, Arial, sans-serif; margin: 0; padding: 0; }
    header { padding: 10px 16px; background: #111; color: #eee; font-size: 14px; }
    #container { padding: 12px; }
    svg { width: 100%; height: 80vh; border: 1px solid #ddd; margin: 10px; padding: 10px; }
    .node rect { stroke: #666; fill: #fff; rx: 4; ry: 4; }
    .node.note rect { fill: #fff8dc; }
    .edgePath path { stroke: #333; fill: none; stroke-width: 1.2px; }
  </style>
  <script src="https://d3js.org/d3.v5.min.js"></script>
  <script src="https://unpkg.com/dagre-d3@0.6.4/dist/dagre-d3.min.js"></script>
</head>
<body>
  <header>plangraph - Dagre graph</header>
  <div id="container">
    <svg><g/></svg>
  </div>
  <script>
    const plan = __PLAN_JSON__;
    const COLOR_MAP = __COLOR_MAP__;

    function showMessage(msg) {
      const el = document.getElementById('container');
      el.innerHTML = '<div style="padding:12px;color:#b00;background:#fff3f3;border-top:1px solid #f0caca;">' +
        msg + '</div>' +
        '<pre style="margin:0;padding:12px;white-space:pre-wrap;">' +
        (typeof plan === 'object' ? JSON.stringify(plan, null, 2) : '') + '</pre>';
    }

    if (typeof window.d3 === 'undefined' || typeof window.dagreD3 === 'undefined') {
      showMessage('Failed to load Dagre assets (d3/dagre-d3). Check internet connectivity or vendor the JS locally.');
    } else {
      try {
        const g = new dagreD3.graphlib.Graph({ multigraph: true })
          .setGraph({ rankdir: 'TB', nodesep: 30, ranksep: 40 });
        // Edges need a label object even when unlabeled.
        g.setDefaultEdgeLabel(() => ({}));

        const NOTE_OPS = new Set(['COND.eval', 'ITER.eval', 'PHI', 'LOOP.exit', 'COMP.foreach']);

        (plan.ops || []).forEach(op => {
          let label = op.op;
          if (op.op === 'COND.eval') {
            const kind = (op.args && op.args.kind) || 'if';
            label = (kind.toUpperCase()) + ' ' + (op.args && op.args.expr ? op.args.expr : '');
          } else if (op.op === 'ITER.eval') {
            label = 'FOR ' + (op.args && op.args.expr ? op.args.expr : '');
          } else if (op.op === 'PHI') {
            label = 'PHI' + (op.args && op.args.var ? ` (${op.args.var})` : '');
          }
          const klass = NOTE_OPS.has(op.op) ? 'note' : 'op';
          const color = COLOR_MAP[op.op] || '#fff';
          g.setNode(op.id, { label, class: klass, padding: 8, style: 'fill: ' + color });
        });

        (plan.outputs || []).forEach(out => {
          const outId = `out:${out.as}`;
          const ocolor = COLOR_MAP['output'] || '#fff';
          g.setNode(outId, { label: out.as, class: 'note', padding: 8, style: 'fill: ' + ocolor });
          g.setEdge(out.from, outId);
        });

        const opById = {};
        (plan.ops || []).forEach(op => { opById[op.id] = op; });

        (plan.ops || []).forEach(op => {
          const depLabels = op.dep_labels || [];
          const seen = new Set();
          (op.deps || []).forEach((dep, idx) => {
            const pair = dep + '->' + op.id;
            if (seen.has(pair)) return; seen.add(pair);
            const src = opById[dep];
            let edgeLabel = (depLabels[idx] || '').toString();
            // Empty labels fall back to something readable.
            if (!edgeLabel) {
              if (op.op === 'PACK.dict' && op.args && Array.isArray(op.args.keys)) {
                edgeLabel = (op.args.keys[idx] || '').toString() || dep;
              } else if (src && src.op === 'COND.eval') {
                const kind = src.args && src.args.kind;
                if (kind === 'if') {
                  if ((op.id || '').includes('@then')) edgeLabel = 'then';
                  else if ((op.id || '').includes('@else')) edgeLabel = 'else';
                  else edgeLabel = 'cond';
                } else {
                  edgeLabel = 'cond';
                }
              } else if (src && src.op === 'ITER.eval') {
                edgeLabel = (src.args && src.args.target) ? src.args.target : 'iter';
              } else {
                edgeLabel = dep;
              }
            }
            g.setEdge(dep, op.id, { label: edgeLabel });
          });
        });

        const svg = d3.select('svg');
        const inner = svg.select('g');
        const render = new dagreD3.render();
        render(inner, g);

        const { width, height } = g.graph();
        const svgWidth = document.querySelector('svg').clientWidth;
        const xCenterOffset = (svgWidth - width) / 2;
        inner.attr('transform', 'translate(' + Math.max(10, xCenterOffset) + ', 20)');
        svg.attr('height', height + 40);
      } catch (e) {
        showMessage('Failed to render Dagre graph: ' + e);
      }
    }
  </script>
</body>
</html>
"##;

/// Write the interactive dagre view of `plan` to `path`.
pub fn export_html(plan: &Plan, path: &Path) -> Result<()> {
    let mut color_map = Map::new();
    for op in &plan.ops {
        color_map.insert(op.op.clone(), Value::String(color_for(&op.op).to_string()));
    }
    color_map.insert(
        "output".to_string(),
        Value::String(color_for("output").to_string()),
    );

    let html = TEMPLATE
        .replace("__PLAN_JSON__", &serde_json::to_string(plan)?)
        .replace("__COLOR_MAP__", &serde_json::to_string(&color_map)?);
    fs::write(path, html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plangraph_ir::compile_source;

    #[test]
    fn test_template_placeholders_are_replaced() {
        let plan = compile_source(
            r#"
def flow():
    a = AG.op()
    return a
"#,
            None,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.html");
        export_html(&plan, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("__PLAN_JSON__"));
        assert!(!text.contains("__COLOR_MAP__"));
        assert!(text.contains(r#""version":2"#));
        assert!(text.contains("flow"));
        assert!(text.contains("dagre-d3"));
        // Every op name is a color map key.
        assert!(text.contains(r#""AG.op":"#));
        assert!(text.contains(r#""output":"#));
    }
}
