//! Plan assembly
//!
//! End-to-end entry point: size-gate the source, parse it, pick the
//! function to compile, and run the statement compiler over its body.

use tracing::debug;

use crate::errors::{DslViolation, Result, MAX_SOURCE_CHARS};
use crate::features::lowering::infrastructure::compiler::Compiler;
use crate::features::syntax::ast::Stmt;
use crate::features::syntax::Reader;
use crate::shared::models::plan::Plan;
use crate::shared::utils::tree_sitter::parse_module;

/// Compile DSL source into a plan.
///
/// With `function` given, that function must exist and must compile.
/// Without it, top-level functions are tried in source order and the first
/// that compiles wins; when the module holds exactly one candidate its own
/// violation is surfaced directly instead of the aggregate error.
pub fn compile_source(source: &str, function: Option<&str>) -> Result<Plan> {
    let chars = source.chars().count();
    if chars > MAX_SOURCE_CHARS {
        return Err(DslViolation::SourceTooLarge(chars));
    }

    let tree = parse_module(source)?;
    let root = tree.root_node();
    let reader = Reader::new(source);
    let candidates = reader.top_level_functions(&root);

    if let Some(wanted) = function {
        let (name, node) = candidates
            .iter()
            .find(|(name, _)| name == wanted)
            .ok_or_else(|| DslViolation::FunctionNotFound(wanted.to_string()))?;
        return compile_function(&reader, name, node);
    }

    debug!(candidates = candidates.len(), "auto-detecting plan function");
    let single = candidates.len() == 1;
    let mut last: Option<DslViolation> = None;
    for (name, node) in &candidates {
        match compile_function(&reader, name, node) {
            Ok(plan) => return Ok(plan),
            Err(violation) => {
                debug!(function = %name, %violation, "candidate rejected");
                last = Some(violation);
            }
        }
    }
    match last {
        Some(violation) if single => Err(violation),
        Some(violation) => Err(DslViolation::NoCandidateMatched {
            last: Box::new(violation),
        }),
        None => Err(DslViolation::NoFunctions),
    }
}

fn compile_function(reader: &Reader, name: &str, node: &tree_sitter::Node) -> Result<Plan> {
    debug!(function = %name, "compiling plan function");

    // The no-parameters rule outranks anything wrong inside the body.
    let params = reader.param_names(node);
    if !params.is_empty() {
        return Err(DslViolation::ParamsNotAllowed(name.to_string()));
    }

    let body = reader.read_body(node)?;
    let mut compiler = Compiler::new();
    compiler.compile_body(&body)?;
    let plan = compiler.into_plan(name, ends_in_control(&body))?;
    debug!(
        function = %name,
        ops = plan.ops.len(),
        outputs = plan.outputs.len(),
        "plan compiled"
    );
    Ok(plan)
}

fn ends_in_control(body: &[Stmt]) -> bool {
    matches!(
        body.last(),
        Some(Stmt::If { .. } | Stmt::For { .. } | Stmt::While { .. } | Stmt::Try { .. })
    )
}
