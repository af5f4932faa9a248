//! Integration tests for linear plan compilation
//!
//! End-to-end compilation of straight-line DSL bodies: operation shapes,
//! argument handling, output resolution, declarations, selection rules,
//! and the structural guarantees every plan carries (unique ids, no
//! forward references, deterministic output).

use plangraph_ir::{compile_source, DslViolation, Plan, MAX_OPERATIONS};
use pretty_assertions::assert_eq;
use serde_json::json;

fn compile(source: &str) -> Plan {
    compile_source(source, None).expect("source should compile")
}

// ========================================
// Basic operation shapes
// ========================================

#[test]
fn test_two_op_linear_flow() {
    let plan = compile(
        r#"
def flow():
    a = AG.op1()
    b = AG.op2(a, k=1)
    return b
"#,
    );

    assert_eq!(plan.version, 2);
    assert_eq!(plan.function.as_deref(), Some("flow"));
    assert_eq!(plan.ops.len(), 2);

    let a = &plan.ops[0];
    assert_eq!(a.id, "a_1");
    assert_eq!(a.op, "AG.op1");
    assert!(a.deps.is_empty());
    assert!(a.args.is_empty());

    let b = &plan.ops[1];
    assert_eq!(b.id, "b_1");
    assert_eq!(b.op, "AG.op2");
    assert_eq!(b.deps, vec!["a_1"]);
    assert_eq!(b.dep_labels, vec![""]);
    assert_eq!(b.args.get("k"), Some(&json!(1)));

    assert_eq!(plan.outputs.len(), 1);
    assert_eq!(plan.outputs[0].from, "b_1");
    assert_eq!(plan.outputs[0].label, "return");
}

#[test]
fn test_rebinding_gets_fresh_versions() {
    let plan = compile(
        r#"
def flow():
    x = AG.first()
    x = AG.second(x)
    x = AG.third(x)
    return x
"#,
    );

    let ids: Vec<&str> = plan.ops.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["x_1", "x_2", "x_3"]);
    assert_eq!(plan.op("x_2").unwrap().deps, vec!["x_1"]);
    assert_eq!(plan.op("x_3").unwrap().deps, vec!["x_2"]);
    assert_eq!(plan.outputs[0].from, "x_3");
}

#[test]
fn test_awaited_call_sets_flag() {
    let plan = compile(
        r#"
async def flow():
    a = await AG.fetch()
    b = AG.sync(a)
    return b
"#,
    );

    assert!(plan.op("a_1").unwrap().awaited);
    assert!(!plan.op("b_1").unwrap().awaited);
}

#[test]
fn test_name_assignment_is_an_alias() {
    let plan = compile(
        r#"
def flow():
    a = AG.src()
    b = a
    c = AG.use(b)
    return c
"#,
    );

    // `b = a` emits nothing; `c` depends straight on a's id.
    assert_eq!(plan.ops.len(), 2);
    assert_eq!(plan.op("c_1").unwrap().deps, vec!["a_1"]);
}

// ========================================
// Arguments
// ========================================

#[test]
fn test_literal_positional_is_boxed() {
    let plan = compile(
        r#"
def flow():
    r = AG.greet("hello", 3)
    return r
"#,
    );

    assert_eq!(plan.ops.len(), 3);
    assert_eq!(plan.op("const_1").unwrap().args.get("value"), Some(&json!("hello")));
    assert_eq!(plan.op("const_2").unwrap().args.get("value"), Some(&json!(3)));
    let r = plan.op("r_1").unwrap();
    assert_eq!(r.deps, vec!["const_1", "const_2"]);
    assert_eq!(r.dep_labels, vec!["", ""]);
}

#[test]
fn test_keyword_name_becomes_labeled_dep() {
    let plan = compile(
        r#"
def flow():
    a = AG.src()
    r = AG.use(data=a, mode="fast")
    return r
"#,
    );

    let r = plan.op("r_1").unwrap();
    assert_eq!(r.deps, vec!["a_1"]);
    assert_eq!(r.dep_labels, vec!["data"]);
    assert_eq!(r.args.get("mode"), Some(&json!("fast")));
}

#[test]
fn test_splat_expands_pack_elements() {
    let plan = compile(
        r#"
def flow():
    base = AG.base()
    args = [base]
    kw = {"retries": 2}
    b = AG.call(*args, **kw)
    return b
"#,
    );

    assert_eq!(plan.op("args_1").unwrap().op, "PACK.list");
    assert_eq!(plan.op("args_1").unwrap().deps, vec!["base_1"]);
    assert_eq!(plan.op("kw_1").unwrap().op, "CONST.value");

    // The splat re-exposes the packed element, not the pack itself.
    let b = plan.op("b_1").unwrap();
    assert_eq!(b.deps, vec!["base_1", "kw_1"]);
    assert_eq!(b.dep_labels, vec!["*", "**"]);
}

#[test]
fn test_tuple_of_names_expands_per_element() {
    let plan = compile(
        r#"
def flow():
    a = AG.one()
    b = AG.two()
    r = AG.zip([a, b])
    return r
"#,
    );

    let r = plan.op("r_1").unwrap();
    assert_eq!(r.deps, vec!["a_1", "b_1"]);
    assert_eq!(r.dep_labels, vec!["", ""]);
}

#[test]
fn test_undefined_positional_name_fails() {
    let err = compile_source(
        r#"
def flow():
    r = AG.use(ghost)
    return r
"#,
        Some("flow"),
    )
    .unwrap_err();
    assert!(matches!(err, DslViolation::UndefinedDependency(name) if name == "ghost"));
}

// ========================================
// Expressions
// ========================================

#[test]
fn test_fstring_one_dep_per_slot() {
    let plan = compile(
        r#"
def flow():
    user = AG.user()
    city = AG.city()
    msg = f"{user} went to {city} near {user}"
    return msg
"#,
    );

    let msg = plan.op("msg_1").unwrap();
    assert_eq!(msg.op, "TEXT.format");
    assert_eq!(msg.args.get("template"), Some(&json!("{0} went to {1} near {2}")));
    assert_eq!(msg.deps, vec!["user_1", "city_1", "user_1"]);
}

#[test]
fn test_comprehension_keeps_bound_free_names() {
    let plan = compile(
        r#"
def flow():
    rows = AG.rows()
    scale = AG.scale()
    out = [transform(r, scale) for r in rows]
    return out
"#,
    );

    let out = plan.op("out_1").unwrap();
    assert_eq!(out.op, "COMP.listcomp");
    // `transform` and the loop variable `r` are not plan values.
    assert_eq!(out.deps, vec!["scale_1", "rows_1"]);
}

#[test]
fn test_subscript_read_and_write() {
    let plan = compile(
        r#"
def flow():
    cfg = AG.defaults()
    cfg["mode"] = "fast"
    m = cfg["mode"]
    return m
"#,
    );

    let set = plan.op("cfg_2").unwrap();
    assert_eq!(set.op, "SET.item");
    assert_eq!(set.deps, vec!["cfg_1", "const_1"]);
    assert_eq!(set.args.get("key"), Some(&json!("mode")));

    // The read sees the mutated container version.
    let get = plan.op("m_1").unwrap();
    assert_eq!(get.op, "GET.item");
    assert_eq!(get.deps, vec!["cfg_2"]);
    assert_eq!(get.args.get("key"), Some(&json!("mode")));

    assert_eq!(plan.outputs[0].from, "m_1");
}

#[test]
fn test_operator_expression_becomes_expr_eval() {
    let plan = compile(
        r#"
def flow():
    n = AG.num()
    doubled = n * 2 + offset
    return doubled
"#,
    );

    let op = plan.op("doubled_1").unwrap();
    assert_eq!(op.op, "EXPR.eval");
    assert_eq!(op.args.get("expr"), Some(&json!("n * 2 + offset")));
    // `offset` is unbound and silently dropped from deps.
    assert_eq!(op.deps, vec!["n_1"]);
}

#[test]
fn test_dict_pack_with_mixed_values() {
    let plan = compile(
        r#"
def flow():
    v = AG.score()
    d = {"score": v, "weight": 2, "derived": v + 1}
    return d
"#,
    );

    let d = plan.op("d_1").unwrap();
    assert_eq!(d.op, "PACK.dict");
    assert_eq!(d.args.get("keys"), Some(&json!(["score", "weight", "derived"])));
    // v resolves, 2 boxes into a CONST, `v + 1` falls back to its text.
    assert_eq!(d.deps, vec!["v_1", "const_1", "const_2"]);
    assert_eq!(plan.op("const_2").unwrap().args.get("value"), Some(&json!("v + 1")));
}

#[test]
fn test_nonliteral_list_rejects_expressions() {
    let err = compile_source(
        r#"
def flow():
    v = AG.score()
    xs = [v, v + 1]
    return xs
"#,
        Some("flow"),
    )
    .unwrap_err();
    assert!(matches!(err, DslViolation::UnsupportedLiteral(_)), "{err}");
}

// ========================================
// Declarations
// ========================================

#[test]
fn test_settings_and_outputs() {
    let plan = compile(
        r#"
def flow():
    settings(retries=3, mode="fast")
    a = AG.fetch()
    output(a, as_="result.json")
"#,
    );

    assert_eq!(plan.settings.get("retries"), Some(&json!(3)));
    assert_eq!(plan.settings.get("mode"), Some(&json!("fast")));
    assert_eq!(plan.outputs.len(), 1);
    assert_eq!(plan.outputs[0].from, "a_1");
    assert_eq!(plan.outputs[0].label, "result.json");
    // Declarations emit no operations.
    assert_eq!(plan.ops.len(), 1);
}

#[test]
fn test_later_settings_override_earlier() {
    let plan = compile(
        r#"
def flow():
    settings(mode="fast")
    settings(mode="slow", depth=2)
    a = AG.go()
    return a
"#,
    );

    assert_eq!(plan.settings.get("mode"), Some(&json!("slow")));
    assert_eq!(plan.settings.get("depth"), Some(&json!(2)));
}

#[test]
fn test_explicit_outputs_beat_return() {
    let plan = compile(
        r#"
def flow():
    a = AG.one()
    b = AG.two()
    output(a, as_="a.json")
    output(b, as_="b.json")
    return b
"#,
    );

    let labels: Vec<&str> = plan.outputs.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["a.json", "b.json"]);
}

#[test]
fn test_output_of_unbound_name_fails() {
    let err = compile_source(
        r#"
def flow():
    a = AG.one()
    output(ghost, as_="g.json")
"#,
        Some("flow"),
    )
    .unwrap_err();
    assert!(matches!(err, DslViolation::UndefinedDependency(_)), "{err}");
}

#[test]
fn test_body_without_return_synthesizes_null() {
    let plan = compile(
        r#"
def flow():
    a = AG.fire()
"#,
    );

    assert_eq!(plan.ops.len(), 2);
    let synth = plan.op("return_value_1").unwrap();
    assert_eq!(synth.op, "CONST.value");
    assert_eq!(synth.args.get("value"), Some(&json!(null)));
    assert_eq!(plan.outputs[0].from, "return_value_1");
    assert_eq!(plan.outputs[0].label, "return");
}

#[test]
fn test_return_literal_boxes_const() {
    let plan = compile(
        r#"
def flow():
    a = AG.work()
    return 42
"#,
    );

    assert_eq!(plan.op("return_value_1").unwrap().args.get("value"), Some(&json!(42)));
    assert_eq!(plan.outputs[0].from, "return_value_1");
}

// ========================================
// Selection and gates
// ========================================

#[test]
fn test_explicit_function_not_found() {
    let err = compile_source("def flow():\n    return 1\n", Some("missing")).unwrap_err();
    assert!(matches!(err, DslViolation::FunctionNotFound(name) if name == "missing"));
}

#[test]
fn test_auto_detect_skips_noncompiling_candidates() {
    let plan = compile(
        r#"
def helper(x):
    return x

def plan():
    a = AG.go()
    return a
"#,
    );

    assert_eq!(plan.function.as_deref(), Some("plan"));
}

#[test]
fn test_no_functions_in_module() {
    let err = compile_source("x = 1\n", None).unwrap_err();
    assert!(matches!(err, DslViolation::NoFunctions));
}

#[test]
fn test_single_bad_candidate_error_is_unwrapped() {
    let err = compile_source(
        r#"
def flow():
    import os
"#,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, DslViolation::UnsupportedStatement(_)), "{err}");
}

#[test]
fn test_multiple_bad_candidates_wrap_last_error() {
    let err = compile_source(
        r#"
def first(x):
    return x

def second():
    import os
"#,
        None,
    )
    .unwrap_err();
    match err {
        DslViolation::NoCandidateMatched { last } => {
            assert!(matches!(*last, DslViolation::UnsupportedStatement(_)));
        }
        other => panic!("expected NoCandidateMatched, got {other}"),
    }
}

#[test]
fn test_parameters_rejected_before_body() {
    // The body violation must not preempt the signature rule.
    for signature in ["x", "x=1", "*args", "**kw", "*, k"] {
        let source = format!("def flow({signature}):\n    import os\n");
        let err = compile_source(&source, Some("flow")).unwrap_err();
        assert!(
            matches!(err, DslViolation::ParamsNotAllowed(ref name) if name == "flow"),
            "signature `{signature}` gave {err}"
        );
    }
}

#[test]
fn test_source_size_gate() {
    let padding = "# x\n".repeat(6000);
    let source = format!("{padding}def flow():\n    return 1\n");
    let err = compile_source(&source, None).unwrap_err();
    assert!(matches!(err, DslViolation::SourceTooLarge(_)));
}

#[test]
fn test_operation_ceiling() {
    let mut body = String::new();
    for i in 0..=MAX_OPERATIONS {
        body.push_str(&format!("    v{i} = AG.step()\n"));
    }
    let source = format!("def flow():\n{body}    return v0\n");
    let err = compile_source(&source, None).unwrap_err();
    assert!(matches!(err, DslViolation::PlanTooLarge(n) if n == MAX_OPERATIONS + 1));
}

// ========================================
// Structural guarantees
// ========================================

#[test]
fn test_ids_unique_and_no_forward_deps() {
    let plan = compile(
        r#"
def flow():
    raw = AG.load()
    if raw:
        clean = AG.scrub(raw)
        raw = AG.tag(clean)
    else:
        raw = AG.keep(raw)
    for item in raw:
        raw = AG.fold(raw, item)
    total = AG.sum(raw)
    return total
"#,
    );

    let mut seen: Vec<&str> = Vec::new();
    for op in &plan.ops {
        assert!(!seen.contains(&op.id.as_str()), "duplicate id {}", op.id);
        for dep in &op.deps {
            assert!(
                seen.contains(&dep.as_str()),
                "op {} references {} before it is defined",
                op.id,
                dep
            );
        }
        seen.push(&op.id);
        assert_eq!(op.deps.len(), op.dep_labels.len(), "parallel arrays on {}", op.id);
    }
    for output in &plan.outputs {
        assert!(seen.contains(&output.from.as_str()), "dangling output {}", output.from);
    }
}

#[test]
fn test_compilation_is_deterministic() {
    let source = r#"
def flow():
    settings(mode="fast")
    a = AG.load()
    if a:
        b = AG.clean(a)
    else:
        b = AG.raw(a)
    out = f"done {b}"
    return out
"#;

    let first = serde_json::to_string(&compile(source)).unwrap();
    let second = serde_json::to_string(&compile(source)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_serialized_shape() {
    let plan = compile(
        r#"
def flow():
    a = AG.go()
    return a
"#,
    );

    let value = serde_json::to_value(&plan).unwrap();
    assert_eq!(value["version"], json!(2));
    assert_eq!(value["function"], json!("flow"));
    assert_eq!(value["outputs"][0], json!({"from": "a_1", "as": "return"}));
    // Empty settings are omitted entirely.
    assert!(value.get("settings").is_none());

    let op = &value["ops"][0];
    let keys: Vec<&str> = op.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id", "op", "deps", "args", "dep_labels", "awaited"]);
}
