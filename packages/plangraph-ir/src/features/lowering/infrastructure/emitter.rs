//! Expression emitter
//!
//! Lowers one expression into arena operations. The contract throughout:
//! resolve and lower every sub-expression FIRST, mint the target id LAST.
//! That order makes `x = A.f(x)` consume the previous version of `x`
//! instead of the one being defined.

use serde_json::{Map, Value};

use crate::errors::{DslViolation, Result};
use crate::features::lowering::domain::arena::OpArena;
use crate::features::ssa::VariableTable;
use crate::features::syntax::ast::{
    Arg, CallExpr, CompKind, Expr, KwSplat, KwValue, PackElem, PackExpr, PosArg, StarArg,
    TextExpr,
};
use crate::shared::models::plan::{
    Operation, LABEL_KWSPLAT, LABEL_SPLAT, OP_COMP_FOREACH, OP_COND_EVAL, OP_CONST, OP_EXPR_EVAL,
    OP_GET_ITEM, OP_ITER_EVAL, OP_PACK_DICT, OP_PACK_LIST, OP_PACK_TUPLE, OP_PHI, OP_TEXT_FORMAT,
};

pub struct Emitter<'a> {
    pub ops: &'a mut OpArena,
    pub table: &'a mut VariableTable,
}

impl Emitter<'_> {
    /// Lower `expr`, binding the resulting id to `bind_to` when given.
    /// Returns the id carrying the expression's value.
    pub fn emit(&mut self, expr: &Expr, bind_to: Option<&str>) -> Result<String> {
        match expr {
            Expr::Name(name) => {
                let id = self.resolve(name)?;
                if let Some(target) = bind_to {
                    self.table.alias(target, &id);
                }
                Ok(id)
            }
            Expr::Literal(value) => self.emit_const(value.clone(), bind_to),
            Expr::Call(call) => self.emit_call(call, bind_to),
            Expr::FString { template, slots } => self.emit_fstring(template, slots, bind_to),
            Expr::Pack(pack) => self.emit_pack(pack, bind_to),
            Expr::Comprehension { kind, names } => self.emit_comprehension(*kind, names, bind_to),
            Expr::GetItem { base, key } => self.emit_get_item(base, key, bind_to),
            Expr::Ternary {
                test,
                then_value,
                else_value,
            } => {
                let id = self.emit_ternary(test, then_value, else_value)?;
                if let Some(target) = bind_to {
                    self.table.alias(target, &id);
                }
                Ok(id)
            }
            Expr::Opaque(text) => self.emit_opaque(text, bind_to),
        }
    }

    /// Resolve `name` to its current id or fail.
    pub fn resolve(&self, name: &str) -> Result<String> {
        self.table
            .resolve(name)
            .map(str::to_string)
            .ok_or_else(|| DslViolation::UndefinedDependency(name.to_string()))
    }

    /// Names with a current binding, in the order given. Unbound names
    /// (builtins, in-expression locals) are dropped.
    fn bound_subset(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter_map(|n| self.table.resolve(n))
            .map(str::to_string)
            .collect()
    }

    fn mint(&mut self, bind_to: Option<&str>, internal: &str) -> String {
        match bind_to {
            Some(target) => self.table.bind(target),
            None => self.table.bind_internal(internal),
        }
    }

    fn emit_const(&mut self, value: Value, bind_to: Option<&str>) -> Result<String> {
        let id = self.mint(bind_to, "const");
        self.ops
            .push(Operation::new(id.clone(), OP_CONST).with_arg("value", value))?;
        Ok(id)
    }

    pub fn emit_call(&mut self, call: &CallExpr, bind_to: Option<&str>) -> Result<String> {
        let mut deps: Vec<(String, String)> = Vec::new();
        let mut args: Map<String, Value> = Map::new();
        for arg in &call.args {
            match arg {
                Arg::Pos(PosArg::Name(name)) => {
                    deps.push((self.resolve(name)?, String::new()));
                }
                Arg::Pos(PosArg::Literal(value)) => {
                    let boxed = self.emit_const(value.clone(), None)?;
                    deps.push((boxed, String::new()));
                }
                Arg::Pos(PosArg::NameList(names)) => {
                    for name in names {
                        deps.push((self.resolve(name)?, String::new()));
                    }
                }
                Arg::Star(StarArg::Name(name)) => {
                    let id = self.resolve(name)?;
                    // Splatting a pack re-exposes the packed elements.
                    match self.ops.get(&id) {
                        Some(pack)
                            if pack.op == OP_PACK_LIST || pack.op == OP_PACK_TUPLE =>
                        {
                            for dep in pack.deps.clone() {
                                deps.push((dep, LABEL_SPLAT.to_string()));
                            }
                        }
                        _ => deps.push((id, LABEL_SPLAT.to_string())),
                    }
                }
                Arg::Star(StarArg::Names(names)) => {
                    for name in names {
                        deps.push((self.resolve(name)?, LABEL_SPLAT.to_string()));
                    }
                }
                Arg::Keyword {
                    name,
                    value: KwValue::Name(var),
                } => {
                    deps.push((self.resolve(var)?, name.clone()));
                }
                Arg::Keyword {
                    name,
                    value: KwValue::Literal(value),
                } => {
                    args.insert(name.clone(), value.clone());
                }
                Arg::KwSplat(KwSplat::Name(name)) => {
                    deps.push((self.resolve(name)?, LABEL_KWSPLAT.to_string()));
                }
                Arg::KwSplat(KwSplat::Pairs(pairs)) => {
                    for (key, value) in pairs {
                        args.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        let id = self.mint(bind_to, "call");
        let mut op = Operation::new(id.clone(), call.callee.clone());
        op.awaited = call.awaited;
        for (dep, label) in deps {
            op.push_dep(dep, label);
        }
        op.args = args;
        self.ops.push(op)?;
        Ok(id)
    }

    fn emit_fstring(
        &mut self,
        template: &str,
        slots: &[String],
        bind_to: Option<&str>,
    ) -> Result<String> {
        // Every slot must resolve; a formatted string with a hole is an error.
        let mut deps = Vec::with_capacity(slots.len());
        for slot in slots {
            deps.push(self.resolve(slot)?);
        }
        let id = self.mint(bind_to, "text");
        let mut op = Operation::new(id.clone(), OP_TEXT_FORMAT)
            .with_arg("template", Value::String(template.to_string()));
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    fn emit_pack(&mut self, pack: &PackExpr, bind_to: Option<&str>) -> Result<String> {
        match pack {
            PackExpr::List(names) => self.emit_pack_names(OP_PACK_LIST, names, bind_to),
            PackExpr::Tuple(names) => self.emit_pack_names(OP_PACK_TUPLE, names, bind_to),
            PackExpr::Dict { keys, values } => {
                let mut deps = Vec::with_capacity(values.len());
                for value in values {
                    deps.push(self.emit_pack_elem(value)?);
                }
                let id = self.mint(bind_to, "pack");
                let mut op = Operation::new(id.clone(), OP_PACK_DICT)
                    .with_arg("keys", Value::Array(keys.clone()));
                for dep in deps {
                    op.push_dep(dep, "");
                }
                self.ops.push(op)?;
                Ok(id)
            }
        }
    }

    fn emit_pack_names(
        &mut self,
        kind: &str,
        names: &[String],
        bind_to: Option<&str>,
    ) -> Result<String> {
        let mut deps = Vec::with_capacity(names.len());
        for name in names {
            deps.push(self.resolve(name)?);
        }
        let id = self.mint(bind_to, "pack");
        let mut op = Operation::new(id.clone(), kind);
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    fn emit_pack_elem(&mut self, elem: &PackElem) -> Result<String> {
        match elem {
            PackElem::Name(name) => self.resolve(name),
            PackElem::Call(call) => self.emit_call(call, None),
            PackElem::Literal(value) => self.emit_const(value.clone(), None),
            PackElem::Raw(text) => self.emit_const(Value::String(text.clone()), None),
        }
    }

    fn emit_comprehension(
        &mut self,
        kind: CompKind,
        names: &[String],
        bind_to: Option<&str>,
    ) -> Result<String> {
        let deps = self.bound_subset(names);
        let id = self.mint(bind_to, "comp");
        let mut op = Operation::new(id.clone(), kind.op_name());
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    fn emit_get_item(&mut self, base: &str, key: &Value, bind_to: Option<&str>) -> Result<String> {
        let base_id = self.resolve(base)?;
        let id = self.mint(bind_to, "item");
        let mut op = Operation::new(id.clone(), OP_GET_ITEM).with_arg("key", key.clone());
        op.push_dep(base_id, "");
        self.ops.push(op)?;
        Ok(id)
    }

    fn emit_opaque(&mut self, text: &TextExpr, bind_to: Option<&str>) -> Result<String> {
        let deps = self.bound_subset(&text.names);
        let id = self.mint(bind_to, "expr");
        let mut op = Operation::new(id.clone(), OP_EXPR_EVAL)
            .with_arg("expr", Value::String(text.text.clone()));
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    /// Emit a condition node for `if`, `while` or a ternary.
    pub fn emit_cond(&mut self, kind: &str, test: &TextExpr) -> Result<String> {
        let deps = self.bound_subset(&test.names);
        let id = self.table.bind_internal("cond");
        let mut op = Operation::new(id.clone(), OP_COND_EVAL)
            .with_arg("kind", Value::String(kind.to_string()))
            .with_arg("expr", Value::String(test.text.clone()));
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    /// Emit the iterator source node of a `for` loop.
    pub fn emit_iter(&mut self, iter: &TextExpr, target: &str) -> Result<String> {
        let deps = self.bound_subset(&iter.names);
        let id = self.table.bind_internal("iter");
        let mut op = Operation::new(id.clone(), OP_ITER_EVAL)
            .with_arg("expr", Value::String(iter.text.clone()))
            .with_arg("target", Value::String(target.to_string()));
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    /// Emit the per-iteration marker closing a `for` body.
    pub fn emit_foreach(&mut self, iter: &TextExpr) -> Result<String> {
        let deps = self.bound_subset(&iter.names);
        let id = self.table.bind_internal("foreach");
        let mut op = Operation::new(id.clone(), OP_COMP_FOREACH);
        for dep in deps {
            op.push_dep(dep, "");
        }
        self.ops.push(op)?;
        Ok(id)
    }

    /// Inline conditional: condition node, both value arms anchored to it,
    /// then an unnamed PHI joining the arms.
    fn emit_ternary(
        &mut self,
        test: &TextExpr,
        then_value: &Expr,
        else_value: &Expr,
    ) -> Result<String> {
        let cond_id = self.emit_cond("ternary", test)?;

        let then_mark = self.ops.len();
        let then_id = self.emit(then_value, None)?;
        self.anchor_if_emitted(then_mark, &cond_id);

        let else_mark = self.ops.len();
        let else_id = self.emit(else_value, None)?;
        self.anchor_if_emitted(else_mark, &cond_id);

        let id = self.table.bind_internal("phi");
        let mut op = Operation::new(id.clone(), OP_PHI);
        op.push_dep(then_id, "");
        op.push_dep(else_id, "");
        self.ops.push(op)?;
        Ok(id)
    }

    fn anchor_if_emitted(&mut self, mark: usize, dep: &str) {
        if self.ops.len() > mark {
            self.ops.anchor(mark, dep);
        }
    }
}
