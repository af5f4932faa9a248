//! Plan IR - the serialized dependency graph
//!
//! A plan is a static description of one DSL function: versioned operations
//! in emission order, data-dependency edges, and declared outputs. Nothing
//! here is executable; downstream consumers (renderers, schedulers) read the
//! JSON form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plan format version written into every serialized plan
pub const PLAN_VERSION: u32 = 2;

/// Dependency label for a splatted positional argument
pub const LABEL_SPLAT: &str = "*";

/// Dependency label for a splatted keyword argument
pub const LABEL_KWSPLAT: &str = "**";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Built-in operation names
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const OP_CONST: &str = "CONST.value";
pub const OP_PACK_LIST: &str = "PACK.list";
pub const OP_PACK_TUPLE: &str = "PACK.tuple";
pub const OP_PACK_DICT: &str = "PACK.dict";
pub const OP_TEXT_FORMAT: &str = "TEXT.format";
pub const OP_COMP_FOREACH: &str = "COMP.foreach";
pub const OP_GET_ITEM: &str = "GET.item";
pub const OP_SET_ITEM: &str = "SET.item";
pub const OP_EXPR_EVAL: &str = "EXPR.eval";
pub const OP_COND_EVAL: &str = "COND.eval";
pub const OP_ITER_EVAL: &str = "ITER.eval";
pub const OP_ITER_ITEM: &str = "ITER.item";
pub const OP_PHI: &str = "PHI";
pub const OP_LOOP_EXIT: &str = "LOOP.exit";

/// One node of the dependency graph
///
/// `deps` and `dep_labels` are parallel: `""` marks a plain positional
/// dependency, a name marks a keyword binding, `"*"`/`"**"` mark splat
/// expansion. Every dep refers to an id bound by an earlier operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// SSA id, e.g. `x_2` or `x_2@then1`
    pub id: String,

    /// Dotted operation name, e.g. `AG.op2` or `CONST.value`
    pub op: String,

    /// Ids this operation consumes, in argument order
    pub deps: Vec<String>,

    /// Literal keyword arguments
    pub args: Map<String, Value>,

    /// Labels parallel to `deps`
    pub dep_labels: Vec<String>,

    /// True when the source wrapped the call in `await`
    pub awaited: bool,
}

impl Operation {
    pub fn new(id: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            op: op.into(),
            deps: Vec::new(),
            args: Map::new(),
            dep_labels: Vec::new(),
            awaited: false,
        }
    }

    /// Append a dependency, keeping `deps`/`dep_labels` parallel.
    pub fn push_dep(&mut self, dep: impl Into<String>, label: impl Into<String>) {
        self.deps.push(dep.into());
        self.dep_labels.push(label.into());
    }

    /// Whether `id` is already a dependency of this operation.
    pub fn depends_on(&self, id: &str) -> bool {
        self.deps.iter().any(|d| d == id)
    }

    /// Set one literal argument (builder style).
    pub fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.args.insert(key.to_string(), value);
        self
    }
}

/// A declared plan result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Id of the operation whose value is exported
    pub from: String,

    /// Consumer-facing label, e.g. a file name or `"return"`
    #[serde(rename = "as")]
    pub label: String,
}

/// A compiled plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Format version, always [`PLAN_VERSION`]
    pub version: u32,

    /// Name of the compiled function
    pub function: Option<String>,

    /// Operations in emission order (textual/control order)
    pub ops: Vec<Operation>,

    /// Declared outputs
    pub outputs: Vec<Output>,

    /// Literal run settings from `settings(...)` declarations
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub settings: Map<String, Value>,
}

impl Plan {
    /// Look up an operation by id.
    pub fn op(&self, id: &str) -> Option<&Operation> {
        self.ops.iter().find(|o| o.id == id)
    }
}
