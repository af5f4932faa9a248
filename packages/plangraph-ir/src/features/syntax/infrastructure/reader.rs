//! CST → typed AST reader
//!
//! Walks a tree-sitter parse of the plan DSL and produces the closed AST in
//! [`crate::features::syntax::domain::ast`]. Everything outside the DSL
//! surface is rejected here with the specific violation, so the lowering
//! passes never see a CST node. The reader is purely syntactic: name
//! resolution, SSA versioning, and the operation ceiling all live in the
//! lowering feature.

use serde_json::Value;
use tree_sitter::Node;

use crate::errors::{DslViolation, Result};
use crate::features::syntax::domain::ast::{
    Arg, CallExpr, CompKind, Expr, Handler, KwSplat, KwValue, PackElem, PackExpr, PosArg,
    ReturnValue, StarArg, Stmt, TextExpr,
};
use crate::features::syntax::domain::ident::is_valid_name;
use crate::features::syntax::infrastructure::literal;
use crate::shared::utils::tree_sitter::{
    find_child_by_kind, named_children, node_text, node_text_owned,
};

/// Reads one parsed module; holds the source for text extraction.
pub struct Reader<'s> {
    source: &'s str,
}

impl<'s> Reader<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source }
    }

    // ==================== Functions ====================

    /// Top-level function definitions in source order, decorated and async
    /// ones included.
    pub fn top_level_functions<'t>(&self, root: &Node<'t>) -> Vec<(String, Node<'t>)> {
        let mut found = Vec::new();
        for child in named_children(root) {
            let func = match child.kind() {
                "function_definition" => Some(child),
                "decorated_definition" => child
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition"),
                _ => None,
            };
            if let Some(node) = func {
                if let Some(name) = node.child_by_field_name("name") {
                    found.push((node_text_owned(&name, self.source), node));
                }
            }
        }
        found
    }

    /// Parameter names as written, `*args`/`**kwargs` forms included.
    pub fn param_names(&self, func: &Node) -> Vec<String> {
        let Some(params) = func.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(&params)
            .iter()
            .filter(|p| p.kind() != "comment")
            .map(|p| node_text_owned(p, self.source))
            .collect()
    }

    /// Read a function's suite into typed statements.
    pub fn read_body(&self, func: &Node) -> Result<Vec<Stmt>> {
        let body = self.field(func, "body")?;
        self.read_block(&body)
    }

    // ==================== Statements ====================

    fn read_block(&self, block: &Node) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        for child in named_children(block) {
            if child.kind() == "comment" {
                continue;
            }
            stmts.push(self.read_stmt(&child)?);
        }
        Ok(stmts)
    }

    fn read_stmt(&self, node: &Node) -> Result<Stmt> {
        match node.kind() {
            "expression_statement" => self.read_expr_stmt(node),
            "return_statement" => self.read_return(node),
            "if_statement" => self.read_if(node),
            "for_statement" => self.read_for(node),
            "while_statement" => self.read_while(node),
            "try_statement" => self.read_try(node),
            "break_statement" => Ok(Stmt::Break),
            "continue_statement" => Ok(Stmt::Continue),
            "pass_statement" => Ok(Stmt::Pass),
            _ => Err(DslViolation::UnsupportedStatement(self.snippet(node))),
        }
    }

    fn read_expr_stmt(&self, node: &Node) -> Result<Stmt> {
        let inner = self
            .first_named(node)
            .ok_or_else(|| DslViolation::UnsupportedStatement(self.snippet(node)))?;
        match inner.kind() {
            "assignment" => self.read_assignment(&inner),
            "augmented_assignment" => Err(DslViolation::UnsupportedStatement(format!(
                "augmented assignment: {}",
                self.snippet(&inner)
            ))),
            "call" | "await" => self.read_bare_call(&inner),
            _ => Err(DslViolation::UnsupportedStatement(self.snippet(&inner))),
        }
    }

    fn read_assignment(&self, node: &Node) -> Result<Stmt> {
        if node.child_by_field_name("type").is_some() {
            return Err(DslViolation::UnsupportedStatement(format!(
                "annotated assignment: {}",
                self.snippet(node)
            )));
        }
        let left = self.field(node, "left")?;
        let right = self.field(node, "right")?;
        if right.kind() == "assignment" {
            return Err(DslViolation::UnsupportedStatement(format!(
                "chained assignment: {}",
                self.snippet(node)
            )));
        }

        match left.kind() {
            "identifier" => Ok(Stmt::Assign {
                target: self.target_name(&left)?,
                value: self.read_expr(&right)?,
            }),
            "subscript" => {
                let base = self.field(&left, "value")?;
                if base.kind() != "identifier" {
                    return Err(DslViolation::UnsupportedTarget(self.snippet(&left)));
                }
                let key = literal::materialize(&self.subscript_key(&left)?, self.source)?;
                Ok(Stmt::SetItem {
                    container: node_text_owned(&base, self.source),
                    key,
                    value: self.read_expr(&right)?,
                })
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" => Err(
                DslViolation::UnsupportedTarget(format!("tuple unpacking: {}", self.snippet(&left))),
            ),
            _ => Err(DslViolation::UnsupportedTarget(self.snippet(&left))),
        }
    }

    fn read_bare_call(&self, node: &Node) -> Result<Stmt> {
        let (call_node, awaited) = self.unwrap_await(node)?;
        if call_node.kind() != "call" {
            return Err(DslViolation::UnsupportedStatement(self.snippet(node)));
        }
        // The two reserved declarative calls never become operations.
        let callee = self.field(&call_node, "function")?;
        if callee.kind() == "identifier" {
            match node_text(&callee, self.source) {
                "settings" => return self.read_settings(&call_node),
                "output" => return self.read_output(&call_node),
                _ => {}
            }
        }
        Ok(Stmt::Call(self.read_call(&call_node, awaited)?))
    }

    fn read_settings(&self, call: &Node) -> Result<Stmt> {
        let mut pairs = Vec::new();
        for arg in self.call_args(call)? {
            if arg.kind() != "keyword_argument" {
                return Err(DslViolation::BadDeclaration(format!(
                    "settings() accepts keyword literals only, got: {}",
                    self.snippet(&arg)
                )));
            }
            let name = node_text_owned(&self.field(&arg, "name")?, self.source);
            let value_node = self.field(&arg, "value")?;
            let value = literal::try_materialize(&value_node, self.source).ok_or_else(|| {
                DslViolation::BadDeclaration(format!(
                    "settings() values must be literals, got: {}",
                    self.snippet(&value_node)
                ))
            })?;
            pairs.push((name, value));
        }
        Ok(Stmt::Settings(pairs))
    }

    fn read_output(&self, call: &Node) -> Result<Stmt> {
        let mut var: Option<String> = None;
        let mut label: Option<String> = None;
        for arg in self.call_args(call)? {
            match arg.kind() {
                "identifier" if var.is_none() => {
                    var = Some(node_text_owned(&arg, self.source));
                }
                "keyword_argument" => {
                    let name = node_text_owned(&self.field(&arg, "name")?, self.source);
                    if name != "as_" && name != "as" {
                        return Err(DslViolation::BadDeclaration(format!(
                            "output() got unknown keyword {name:?}"
                        )));
                    }
                    let value_node = self.field(&arg, "value")?;
                    match literal::try_materialize(&value_node, self.source) {
                        Some(Value::String(s)) => label = Some(s),
                        _ => {
                            return Err(DslViolation::BadDeclaration(
                                "output() label must be a string literal".into(),
                            ))
                        }
                    }
                }
                _ => {
                    return Err(DslViolation::BadDeclaration(format!(
                        "output() expects a single variable name plus as_=\"label\", got: {}",
                        self.snippet(&arg)
                    )))
                }
            }
        }
        let var = var.ok_or_else(|| {
            DslViolation::BadDeclaration("output() requires a variable name".into())
        })?;
        let label = label.ok_or_else(|| {
            DslViolation::BadDeclaration("output() requires as_=\"label\"".into())
        })?;
        Ok(Stmt::Output { var, label })
    }

    fn read_return(&self, node: &Node) -> Result<Stmt> {
        let Some(value) = self.first_named(node) else {
            return Ok(Stmt::Return(ReturnValue::Literal(Value::Null)));
        };
        if value.kind() == "identifier" {
            return Ok(Stmt::Return(ReturnValue::Name(node_text_owned(
                &value,
                self.source,
            ))));
        }
        match literal::try_materialize(&value, self.source) {
            Some(v) => Ok(Stmt::Return(ReturnValue::Literal(v))),
            None => Err(DslViolation::UnsupportedReturn(self.snippet(&value))),
        }
    }

    fn read_if(&self, node: &Node) -> Result<Stmt> {
        let test = self.textualize(&self.field(node, "condition")?);
        let then_body = self.read_block(&self.field(node, "consequence")?)?;

        // elif chains nest: each clause becomes an if inside its parent's
        // else body, built back to front.
        let mut else_body: Vec<Stmt> = Vec::new();
        let clauses: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| matches!(c.kind(), "elif_clause" | "else_clause"))
            .collect();
        for clause in clauses.into_iter().rev() {
            if clause.kind() == "else_clause" {
                else_body = self.read_block(&self.field(&clause, "body")?)?;
            } else {
                let elif_test = self.textualize(&self.field(&clause, "condition")?);
                let elif_body = self.read_block(&self.field(&clause, "consequence")?)?;
                else_body = vec![Stmt::If {
                    test: elif_test,
                    then_body: elif_body,
                    else_body,
                }];
            }
        }

        Ok(Stmt::If {
            test,
            then_body,
            else_body,
        })
    }

    fn read_for(&self, node: &Node) -> Result<Stmt> {
        let left = self.field(node, "left")?;
        let target_text = node_text_owned(&left, self.source);
        let targets = self.loop_targets(&left)?;
        let iter = self.textualize(&self.field(node, "right")?);
        let body = self.read_block(&self.field(node, "body")?)?;
        Ok(Stmt::For {
            targets,
            target_text,
            iter,
            body,
        })
    }

    fn read_while(&self, node: &Node) -> Result<Stmt> {
        let test = self.textualize(&self.field(node, "condition")?);
        let body = self.read_block(&self.field(node, "body")?)?;
        Ok(Stmt::While { test, body })
    }

    fn read_try(&self, node: &Node) -> Result<Stmt> {
        let body = self.read_block(&self.field(node, "body")?)?;
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finally = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "except_clause" => {
                    // the clause's last block child is the handler suite;
                    // exception types and aliases are not modeled
                    let block = find_child_by_kind(&child, "block").ok_or_else(|| {
                        DslViolation::Syntax(format!("except clause without body: {}", self.snippet(&child)))
                    })?;
                    handlers.push(Handler {
                        body: self.read_block(&block)?,
                    });
                }
                "except_group_clause" => {
                    return Err(DslViolation::UnsupportedStatement(format!(
                        "except* clause: {}",
                        self.snippet(&child)
                    )))
                }
                "else_clause" => {
                    orelse = self.read_block(&self.field(&child, "body")?)?;
                }
                "finally_clause" => {
                    let block = find_child_by_kind(&child, "block").ok_or_else(|| {
                        DslViolation::Syntax(format!("finally clause without body: {}", self.snippet(&child)))
                    })?;
                    finally = self.read_block(&block)?;
                }
                _ => {} // the try body itself, comments
            }
        }
        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            finally,
        })
    }

    // ==================== Expressions ====================

    fn read_expr(&self, node: &Node) -> Result<Expr> {
        match node.kind() {
            "identifier" => Ok(Expr::Name(node_text_owned(node, self.source))),
            "await" => {
                let (inner, _) = self.unwrap_await(node)?;
                if inner.kind() != "call" {
                    return Err(DslViolation::UnsupportedExpression(self.snippet(node)));
                }
                Ok(Expr::Call(self.read_call(&inner, true)?))
            }
            "call" => Ok(Expr::Call(self.read_call(node, false)?)),
            "string" => {
                if self.is_fstring(node) {
                    let (template, slots) = self.read_fstring_parts(&[*node])?;
                    Ok(Expr::FString { template, slots })
                } else {
                    Ok(Expr::Literal(literal::materialize(node, self.source)?))
                }
            }
            "concatenated_string" => {
                let parts: Vec<Node> = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() != "comment")
                    .collect();
                if parts.iter().any(|p| self.is_fstring(p)) {
                    let (template, slots) = self.read_fstring_parts(&parts)?;
                    Ok(Expr::FString { template, slots })
                } else {
                    Ok(Expr::Literal(literal::materialize(node, self.source)?))
                }
            }
            "true" | "false" | "none" | "integer" | "float" => {
                Ok(Expr::Literal(literal::materialize(node, self.source)?))
            }
            "unary_operator" => match literal::try_materialize(node, self.source) {
                Some(v) => Ok(Expr::Literal(v)),
                None => Ok(Expr::Opaque(self.textualize(node))),
            },
            "list" | "tuple" | "expression_list" => {
                if let Some(v) = literal::try_materialize(node, self.source) {
                    return Ok(Expr::Literal(v));
                }
                let names = self.read_pack_names(node)?;
                Ok(Expr::Pack(if node.kind() == "list" {
                    PackExpr::List(names)
                } else {
                    PackExpr::Tuple(names)
                }))
            }
            "dictionary" => {
                if let Some(v) = literal::try_materialize(node, self.source) {
                    return Ok(Expr::Literal(v));
                }
                self.read_pack_dict(node)
            }
            "list_comprehension" => self.read_comprehension(node, CompKind::List),
            "set_comprehension" => self.read_comprehension(node, CompKind::Set),
            "dictionary_comprehension" => self.read_comprehension(node, CompKind::Dict),
            "generator_expression" => self.read_comprehension(node, CompKind::Generator),
            "subscript" => self.read_get_item(node),
            "conditional_expression" => self.read_ternary(node),
            "binary_operator" | "boolean_operator" | "comparison_operator" | "not_operator" => {
                Ok(Expr::Opaque(self.textualize(node)))
            }
            "parenthesized_expression" => {
                let inner = self
                    .first_named(node)
                    .ok_or_else(|| DslViolation::UnsupportedExpression(self.snippet(node)))?;
                self.read_expr(&inner)
            }
            _ => Err(DslViolation::UnsupportedExpression(self.snippet(node))),
        }
    }

    fn read_comprehension(&self, node: &Node, kind: CompKind) -> Result<Expr> {
        Ok(Expr::Comprehension {
            kind,
            names: self.comprehension_names(node),
        })
    }

    fn read_get_item(&self, node: &Node) -> Result<Expr> {
        let base = self.field(node, "value")?;
        if base.kind() != "identifier" {
            return Err(DslViolation::UnsupportedExpression(self.snippet(node)));
        }
        let key = literal::materialize(&self.subscript_key(node)?, self.source)?;
        Ok(Expr::GetItem {
            base: node_text_owned(&base, self.source),
            key,
        })
    }

    fn read_ternary(&self, node: &Node) -> Result<Expr> {
        // conditional_expression children in order: value-if-true, test,
        // value-if-false
        let parts: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() != "comment")
            .collect();
        let [then_node, test_node, else_node] = parts.as_slice() else {
            return Err(DslViolation::UnsupportedExpression(self.snippet(node)));
        };
        Ok(Expr::Ternary {
            test: self.textualize(test_node),
            then_value: Box::new(self.read_expr(then_node)?),
            else_value: Box::new(self.read_expr(else_node)?),
        })
    }

    /// Non-literal list/tuple displays pack previously bound names; any
    /// other element shape has no pack form.
    fn read_pack_names(&self, node: &Node) -> Result<Vec<String>> {
        named_children(node)
            .iter()
            .filter(|c| c.kind() != "comment")
            .map(|c| match c.kind() {
                "identifier" => Ok(node_text_owned(c, self.source)),
                _ => Err(DslViolation::UnsupportedLiteral(self.snippet(c))),
            })
            .collect()
    }

    fn read_pack_elem(&self, node: &Node) -> Result<PackElem> {
        match node.kind() {
            "identifier" => Ok(PackElem::Name(node_text_owned(node, self.source))),
            "call" => Ok(PackElem::Call(self.read_call(node, false)?)),
            "await" => {
                let (inner, _) = self.unwrap_await(node)?;
                if inner.kind() == "call" {
                    Ok(PackElem::Call(self.read_call(&inner, true)?))
                } else {
                    Ok(PackElem::Raw(self.snippet(node)))
                }
            }
            _ => match literal::try_materialize(node, self.source) {
                Some(v) => Ok(PackElem::Literal(v)),
                None => Ok(PackElem::Raw(node_text_owned(node, self.source))),
            },
        }
    }

    fn read_pack_dict(&self, node: &Node) -> Result<Expr> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for child in named_children(node) {
            if child.kind() == "comment" {
                continue;
            }
            if child.kind() != "pair" {
                // {**spread} has no PACK form
                return Err(DslViolation::UnsupportedLiteral(self.snippet(&child)));
            }
            keys.push(literal::materialize(&self.field(&child, "key")?, self.source)?);
            values.push(self.read_pack_elem(&self.field(&child, "value")?)?);
        }
        Ok(Expr::Pack(PackExpr::Dict { keys, values }))
    }

    // ==================== Calls ====================

    fn read_call(&self, node: &Node, awaited: bool) -> Result<CallExpr> {
        let callee = self.callee_name(&self.field(node, "function")?)?;
        let mut args = Vec::new();
        for arg in self.call_args(node)? {
            args.push(self.read_arg(&arg)?);
        }
        Ok(CallExpr {
            callee,
            args,
            awaited,
        })
    }

    /// A plain or dotted name; anything computed is not a callee.
    fn callee_name(&self, node: &Node) -> Result<String> {
        match node.kind() {
            "identifier" => Ok(node_text_owned(node, self.source)),
            "attribute" => {
                let object = self.field(node, "object")?;
                let attr = self.field(node, "attribute")?;
                Ok(format!(
                    "{}.{}",
                    self.callee_name(&object)?,
                    node_text(&attr, self.source)
                ))
            }
            _ => Err(DslViolation::BadCallee(self.snippet(node))),
        }
    }

    fn read_arg(&self, node: &Node) -> Result<Arg> {
        match node.kind() {
            "identifier" => Ok(Arg::Pos(PosArg::Name(node_text_owned(node, self.source)))),
            "list" | "tuple" => {
                if let Some(v) = literal::try_materialize(node, self.source) {
                    return Ok(Arg::Pos(PosArg::Literal(v)));
                }
                Ok(Arg::Pos(PosArg::NameList(self.name_list(node)?)))
            }
            "list_splat" => {
                let inner = self
                    .first_named(node)
                    .ok_or_else(|| DslViolation::BadSplat(self.snippet(node)))?;
                match inner.kind() {
                    "identifier" => Ok(Arg::Star(StarArg::Name(node_text_owned(
                        &inner,
                        self.source,
                    )))),
                    "list" | "tuple" => Ok(Arg::Star(StarArg::Names(self.name_list(&inner)?))),
                    _ => Err(DslViolation::BadSplat(self.snippet(node))),
                }
            }
            "dictionary_splat" => {
                let inner = self
                    .first_named(node)
                    .ok_or_else(|| DslViolation::BadSplat(self.snippet(node)))?;
                match inner.kind() {
                    "identifier" => Ok(Arg::KwSplat(KwSplat::Name(node_text_owned(
                        &inner,
                        self.source,
                    )))),
                    "dictionary" => match literal::materialize(&inner, self.source)? {
                        Value::Object(map) => {
                            Ok(Arg::KwSplat(KwSplat::Pairs(map.into_iter().collect())))
                        }
                        _ => Err(DslViolation::BadSplat(self.snippet(node))),
                    },
                    _ => Err(DslViolation::BadSplat(self.snippet(node))),
                }
            }
            "keyword_argument" => {
                let name = node_text_owned(&self.field(node, "name")?, self.source);
                let value = self.field(node, "value")?;
                if value.kind() == "identifier" {
                    return Ok(Arg::Keyword {
                        name,
                        value: KwValue::Name(node_text_owned(&value, self.source)),
                    });
                }
                match literal::try_materialize(&value, self.source) {
                    Some(v) => Ok(Arg::Keyword {
                        name,
                        value: KwValue::Literal(v),
                    }),
                    None => Err(DslViolation::UnsupportedLiteral(self.snippet(&value))),
                }
            }
            _ => match literal::try_materialize(node, self.source) {
                Some(v) => Ok(Arg::Pos(PosArg::Literal(v))),
                None => Err(DslViolation::UnsupportedLiteral(self.snippet(node))),
            },
        }
    }

    fn name_list(&self, node: &Node) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for child in named_children(node) {
            if child.kind() == "comment" {
                continue;
            }
            if child.kind() != "identifier" {
                return Err(DslViolation::UnsupportedLiteral(format!(
                    "list arguments must contain only names: {}",
                    self.snippet(node)
                )));
            }
            names.push(node_text_owned(&child, self.source));
        }
        Ok(names)
    }

    // ==================== f-strings ====================

    fn is_fstring(&self, node: &Node) -> bool {
        node.kind() == "string"
            && find_child_by_kind(node, "string_start")
                .map(|s| node_text(&s, self.source).to_ascii_lowercase().contains('f'))
                .unwrap_or(false)
    }

    /// Fold one or more adjacent string parts into a `{0}`-indexed template;
    /// slot numbering runs across all parts.
    fn read_fstring_parts(&self, parts: &[Node]) -> Result<(String, Vec<String>)> {
        let mut template = String::new();
        let mut slots = Vec::new();
        for part in parts {
            if part.kind() != "string" {
                return Err(DslViolation::UnsupportedExpression(self.snippet(part)));
            }
            let mut raw_prefix = false;
            let mut cursor = part.walk();
            for child in part.children(&mut cursor) {
                match child.kind() {
                    "string_start" => {
                        let start = node_text(&child, self.source).to_ascii_lowercase();
                        if start.contains('b') {
                            return Err(DslViolation::UnsupportedExpression(self.snippet(part)));
                        }
                        raw_prefix = start.contains('r');
                    }
                    "string_content" => {
                        let text = node_text(&child, self.source);
                        // doubled braces render literally, as at runtime
                        template.push_str(&text.replace("{{", "{").replace("}}", "}"));
                    }
                    "escape_sequence" => {
                        let text = node_text(&child, self.source);
                        if raw_prefix {
                            template.push_str(text);
                        } else {
                            let decoded = literal::decode_escape(text).ok_or_else(|| {
                                DslViolation::UnsupportedExpression(self.snippet(&child))
                            })?;
                            template.push_str(&decoded);
                        }
                    }
                    "interpolation" => {
                        let name = self.interpolation_name(&child)?;
                        template.push_str(&format!("{{{}}}", slots.len()));
                        slots.push(name);
                    }
                    "string_end" => {}
                    _ => {
                        return Err(DslViolation::UnsupportedExpression(self.snippet(&child)))
                    }
                }
            }
        }
        Ok((template, slots))
    }

    /// Interpolation slots hold exactly one bound name: no attributes,
    /// subscripts, conversions, or format specs.
    fn interpolation_name(&self, node: &Node) -> Result<String> {
        if node.child_by_field_name("format_specifier").is_some()
            || node.child_by_field_name("type_conversion").is_some()
            || find_child_by_kind(node, "=").is_some()
        {
            return Err(DslViolation::UnsupportedExpression(self.snippet(node)));
        }
        let expr = self.field(node, "expression")?;
        if expr.kind() != "identifier" {
            return Err(DslViolation::UnsupportedExpression(format!(
                "f-string slots must be bare names: {}",
                self.snippet(node)
            )));
        }
        Ok(node_text_owned(&expr, self.source))
    }

    // ==================== Opaque expressions ====================

    /// Keep an expression textual: trimmed source plus the names it reads, in
    /// first-appearance order.
    fn textualize(&self, node: &Node) -> TextExpr {
        let mut inner = *node;
        while inner.kind() == "parenthesized_expression" {
            match named_children(&inner)
                .into_iter()
                .find(|c| c.kind() != "comment")
            {
                Some(n) => inner = n,
                None => break,
            }
        }
        let mut names = Vec::new();
        self.collect_names(&inner, &mut names);
        TextExpr {
            text: node_text(&inner, self.source).trim().to_string(),
            names,
        }
    }

    /// Collect name reads, deduplicated, in first-appearance order.
    /// Attribute and keyword names are not reads; a comprehension clause's
    /// left side is a binding, not a read.
    fn collect_names(&self, node: &Node, out: &mut Vec<String>) {
        match node.kind() {
            "identifier" => {
                let name = node_text_owned(node, self.source);
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.collect_names(&object, out);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.collect_names(&value, out);
                }
            }
            "for_in_clause" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.collect_names(&right, out);
                }
            }
            _ => {
                for child in named_children(node) {
                    if child.kind() != "comment" {
                        self.collect_names(&child, out);
                    }
                }
            }
        }
    }

    /// Free names of a comprehension, with the names bound by its own
    /// for-clauses excluded even when they shadow an outer binding.
    fn comprehension_names(&self, node: &Node) -> Vec<String> {
        let mut bound = Vec::new();
        self.comp_bound_names(node, &mut bound);
        let mut names = Vec::new();
        self.collect_names(node, &mut names);
        names.retain(|n| !bound.contains(n));
        names
    }

    fn comp_bound_names(&self, node: &Node, out: &mut Vec<String>) {
        for child in named_children(node) {
            if child.kind() == "for_in_clause" {
                if let Some(left) = child.child_by_field_name("left") {
                    self.identifiers_in(&left, out);
                }
                if let Some(right) = child.child_by_field_name("right") {
                    self.comp_bound_names(&right, out);
                }
            } else {
                self.comp_bound_names(&child, out);
            }
        }
    }

    fn identifiers_in(&self, node: &Node, out: &mut Vec<String>) {
        if node.kind() == "identifier" {
            let name = node_text_owned(node, self.source);
            if !out.contains(&name) {
                out.push(name);
            }
            return;
        }
        for child in named_children(node) {
            self.identifiers_in(&child, out);
        }
    }

    // ==================== Helpers ====================

    fn unwrap_await<'t>(&self, node: &Node<'t>) -> Result<(Node<'t>, bool)> {
        if node.kind() != "await" {
            return Ok((*node, false));
        }
        let inner = self
            .first_named(node)
            .ok_or_else(|| DslViolation::UnsupportedExpression(self.snippet(node)))?;
        Ok((inner, true))
    }

    fn loop_targets(&self, left: &Node) -> Result<Vec<String>> {
        match left.kind() {
            "identifier" => Ok(vec![self.target_name(left)?]),
            "pattern_list" | "tuple_pattern" => {
                let mut names = Vec::new();
                for child in named_children(left) {
                    if child.kind() == "comment" {
                        continue;
                    }
                    if child.kind() != "identifier" {
                        return Err(DslViolation::UnsupportedTarget(self.snippet(&child)));
                    }
                    names.push(self.target_name(&child)?);
                }
                Ok(names)
            }
            _ => Err(DslViolation::UnsupportedTarget(self.snippet(left))),
        }
    }

    fn target_name(&self, node: &Node) -> Result<String> {
        let name = node_text_owned(node, self.source);
        if !is_valid_name(&name) {
            return Err(DslViolation::InvalidIdentifier(name));
        }
        Ok(name)
    }

    fn call_args<'t>(&self, call: &Node<'t>) -> Result<Vec<Node<'t>>> {
        let args = self.field(call, "arguments")?;
        Ok(named_children(&args)
            .into_iter()
            .filter(|c| c.kind() != "comment")
            .collect())
    }

    /// `a[k1, k2]` carries several subscript fields; only a single key is a
    /// valid item access.
    fn subscript_key<'t>(&self, node: &Node<'t>) -> Result<Node<'t>> {
        let mut cursor = node.walk();
        let keys: Vec<Node> = node.children_by_field_name("subscript", &mut cursor).collect();
        match keys.as_slice() {
            [key] => Ok(*key),
            _ => Err(DslViolation::UnsupportedExpression(self.snippet(node))),
        }
    }

    fn first_named<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() != "comment")
    }

    fn field<'t>(&self, node: &Node<'t>, name: &str) -> Result<Node<'t>> {
        node.child_by_field_name(name)
            .ok_or_else(|| DslViolation::Syntax(format!("{} missing {name}", node.kind())))
    }

    /// First line of a node's text, for error messages.
    fn snippet(&self, node: &Node) -> String {
        let text = node_text(node, self.source).trim();
        match text.split('\n').next() {
            Some(first) if first.len() < text.len() => format!("{} ...", first.trim_end()),
            _ => text.to_string(),
        }
    }
}
