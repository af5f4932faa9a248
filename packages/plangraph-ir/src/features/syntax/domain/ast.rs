//! Typed AST for the plan DSL
//!
//! A closed sum type over every expression and statement shape the DSL
//! accepts. The reader rejects everything else up front, so the lowering
//! passes can match exhaustively and stay free of CST plumbing.

use serde_json::Value;

/// Textual form of an expression plus its name references.
///
/// Used where the graph keeps an expression opaque (conditions, iterables,
/// collapsed operator expressions): the text lands in the operation's args
/// and the names become dependencies once filtered against the variable
/// table. Names are in first-appearance order, deduplicated; names bound by
/// an inner comprehension clause are already excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct TextExpr {
    pub text: String,
    pub names: Vec<String>,
}

/// Comprehension flavors, each with its own operation name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

impl CompKind {
    pub fn op_name(self) -> &'static str {
        match self {
            CompKind::List => "COMP.listcomp",
            CompKind::Set => "COMP.setcomp",
            CompKind::Dict => "COMP.dictcomp",
            CompKind::Generator => "COMP.genexpr",
        }
    }
}

/// Positional call argument
#[derive(Debug, Clone, PartialEq)]
pub enum PosArg {
    /// Bound-name reference
    Name(String),
    /// Literal value, boxed into a CONST node at emit time
    Literal(Value),
    /// List/tuple display whose elements are all names
    NameList(Vec<String>),
}

/// `*`-splatted call argument
#[derive(Debug, Clone, PartialEq)]
pub enum StarArg {
    /// `*packed` - expands the pack's elements when one is bound
    Name(String),
    /// `*[a, b]` - inline display of names
    Names(Vec<String>),
}

/// Keyword argument value
#[derive(Debug, Clone, PartialEq)]
pub enum KwValue {
    /// Bound-name reference, becomes a labeled dependency
    Name(String),
    /// Literal, stays inline in the operation's args
    Literal(Value),
}

/// `**`-splatted call argument
#[derive(Debug, Clone, PartialEq)]
pub enum KwSplat {
    /// `**opts` - a single dependency labeled `**`
    Name(String),
    /// `**{"k": 1}` - literal pairs merged into args
    Pairs(Vec<(String, Value)>),
}

/// One call argument in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Pos(PosArg),
    Star(StarArg),
    Keyword { name: String, value: KwValue },
    KwSplat(KwSplat),
}

/// A call to a plan operation, e.g. `await AG.op2(a, k=1)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Plain or dotted callee name
    pub callee: String,
    pub args: Vec<Arg>,
    pub awaited: bool,
}

/// Dict value in a PACK.dict expression
#[derive(Debug, Clone, PartialEq)]
pub enum PackElem {
    Name(String),
    Call(CallExpr),
    Literal(Value),
    /// Fallback: source text wrapped in a CONST
    Raw(String),
}

/// List/tuple/dict display containing at least one non-literal part.
/// List and tuple packs only admit previously bound names; dict values
/// get a richer per-field lowering.
#[derive(Debug, Clone, PartialEq)]
pub enum PackExpr {
    List(Vec<String>),
    Tuple(Vec<String>),
    Dict {
        keys: Vec<Value>,
        values: Vec<PackElem>,
    },
}

/// Expression shapes the DSL can place in value position
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare name reference
    Name(String),
    /// Fully-literal expression, already materialized
    Literal(Value),
    Call(CallExpr),
    /// f-string: `{0}`-indexed template plus one slot name per placeholder
    FString { template: String, slots: Vec<String> },
    Pack(PackExpr),
    /// Comprehension summarized by its free names
    Comprehension { kind: CompKind, names: Vec<String> },
    /// Subscript read with a literal key
    GetItem { base: String, key: Value },
    /// `a if c else b`
    Ternary {
        test: TextExpr,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    /// Binary/unary/boolean/comparison expression kept opaque
    Opaque(TextExpr),
}

/// Return statement payload
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Name(String),
    Literal(Value),
}

/// One except handler (exception types and aliases are not modeled)
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub body: Vec<Stmt>,
}

/// Statement shapes the DSL accepts
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name = expr`
    Assign { target: String, value: Expr },
    /// `container[key] = expr`
    SetItem {
        container: String,
        key: Value,
        value: Expr,
    },
    /// `settings(k=literal, ...)` - plan metadata, no operation
    Settings(Vec<(String, Value)>),
    /// `output(name, as_="label")` - declared result, no operation
    Output { var: String, label: String },
    /// Bare call for side effects
    Call(CallExpr),
    Return(ReturnValue),
    If {
        test: TextExpr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    For {
        /// Loop target names, one ITER.item each
        targets: Vec<String>,
        /// Target as written, for the iterate node's args
        target_text: String,
        iter: TextExpr,
        body: Vec<Stmt>,
    },
    While { test: TextExpr, body: Vec<Stmt> },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        orelse: Vec<Stmt>,
        finally: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
}
