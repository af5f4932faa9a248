//! Statement compiler
//!
//! Walks a function body and builds the plan: straight-line statements go
//! through the expression emitter, control flow forks the variable table,
//! anchors each scope's first operation to its guard, and joins rebound
//! names with PHI operations.

use serde_json::{Map, Value};

use crate::errors::Result;
use crate::features::lowering::domain::arena::OpArena;
use crate::features::lowering::infrastructure::emitter::Emitter;
use crate::features::ssa::{ScopeTags, VariableTable};
use crate::features::syntax::ast::{Expr, Handler, ReturnValue, Stmt, TextExpr};
use crate::shared::models::plan::{
    Operation, Output, Plan, OP_CONST, OP_ITER_ITEM, OP_LOOP_EXIT, OP_PHI, OP_SET_ITEM,
    PLAN_VERSION,
};

pub struct Compiler {
    ops: OpArena,
    table: VariableTable,
    tags: ScopeTags,
    settings: Map<String, Value>,
    outputs: Vec<Output>,
    result: Option<String>,
    loop_depth: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            ops: OpArena::new(),
            table: VariableTable::new(),
            tags: ScopeTags::new(),
            settings: Map::new(),
            outputs: Vec::new(),
            result: None,
            loop_depth: 0,
        }
    }

    fn emitter(&mut self) -> Emitter<'_> {
        Emitter {
            ops: &mut self.ops,
            table: &mut self.table,
        }
    }

    pub fn compile_body(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign { target, value } => {
                self.emitter().emit(value, Some(target))?;
                Ok(())
            }
            Stmt::SetItem {
                container,
                key,
                value,
            } => self.compile_set_item(container, key, value),
            Stmt::Settings(pairs) => {
                for (key, value) in pairs {
                    self.settings.insert(key.clone(), value.clone());
                }
                Ok(())
            }
            Stmt::Output { var, label } => {
                let from = self.emitter().resolve(var)?;
                self.outputs.push(Output {
                    from,
                    label: label.clone(),
                });
                Ok(())
            }
            Stmt::Call(call) => {
                self.emitter().emit_call(call, None)?;
                Ok(())
            }
            Stmt::Return(value) => self.compile_return(value),
            Stmt::If {
                test,
                then_body,
                else_body,
            } => self.compile_if(test, then_body, else_body),
            Stmt::For {
                targets,
                target_text,
                iter,
                body,
            } => self.compile_for(targets, target_text, iter, body),
            Stmt::While { test, body } => self.compile_while(test, body),
            Stmt::Try {
                body,
                handlers,
                orelse,
                finally,
            } => self.compile_try(body, handlers, orelse, finally),
            Stmt::Break => self.emit_loop_exit(),
            Stmt::Continue | Stmt::Pass => Ok(()),
        }
    }

    /// `c[key] = value` consumes the current container version and rebinds
    /// the container name to the SET.item result.
    fn compile_set_item(&mut self, container: &str, key: &Value, value: &Expr) -> Result<()> {
        let mut emitter = self.emitter();
        let container_id = emitter.resolve(container)?;
        let value_id = emitter.emit(value, None)?;
        let id = self.table.bind(container);
        let mut op = Operation::new(id, OP_SET_ITEM).with_arg("key", key.clone());
        op.push_dep(container_id, "");
        op.push_dep(value_id, "");
        self.ops.push(op)
    }

    /// `return` records the result id; compilation continues, so a later
    /// return overwrites an earlier one. Inside a loop the return also
    /// leaves an exit marker.
    fn compile_return(&mut self, value: &ReturnValue) -> Result<()> {
        let id = match value {
            ReturnValue::Name(name) => self.emitter().resolve(name)?,
            ReturnValue::Literal(v) => {
                let id = self.table.bind_internal("return_value");
                self.ops
                    .push(Operation::new(id.clone(), OP_CONST).with_arg("value", v.clone()))?;
                id
            }
        };
        self.result = Some(id);
        if self.loop_depth > 0 {
            self.emit_loop_exit()?;
        }
        Ok(())
    }

    fn emit_loop_exit(&mut self) -> Result<()> {
        let id = self.table.bind_internal("loop_exit");
        self.ops.push(Operation::new(id, OP_LOOP_EXIT))
    }

    fn compile_if(&mut self, test: &TextExpr, then_body: &[Stmt], else_body: &[Stmt]) -> Result<()> {
        let cond_id = self.emitter().emit_cond("if", test)?;
        let (then_tag, else_tag) = self.tags.branch();

        let then_exit = self.compile_scope(then_tag, then_body, &cond_id)?;
        let else_exit = self.compile_scope(else_tag, else_body, &cond_id)?;

        // Any name whose id differs between the branch exits joins with a
        // PHI. A name touched in only one branch still joins: the untouched
        // fork carries the pre-branch id.
        for name in VariableTable::diff(&then_exit, &else_exit) {
            let then_id = then_exit.resolve(&name).map(str::to_string);
            let else_id = else_exit.resolve(&name).map(str::to_string);
            let (Some(then_id), Some(else_id)) = (then_id, else_id) else {
                continue;
            };
            self.emit_phi(&name, then_id, else_id)?;
        }
        Ok(())
    }

    /// Compile `body` against a fork of the working table, anchoring the
    /// scope's first emitted operation to `guard`. Returns the fork at exit;
    /// the working table is untouched.
    fn compile_scope(&mut self, tag: String, body: &[Stmt], guard: &str) -> Result<VariableTable> {
        let fork = self.table.fork(tag);
        let outer = std::mem::replace(&mut self.table, fork);
        let mark = self.ops.len();
        let outcome = self.compile_body(body);
        let exit = std::mem::replace(&mut self.table, outer);
        outcome?;
        if self.ops.len() > mark {
            self.ops.anchor(mark, guard);
        }
        Ok(exit)
    }

    fn compile_for(
        &mut self,
        targets: &[String],
        target_text: &str,
        iter: &TextExpr,
        body: &[Stmt],
    ) -> Result<()> {
        let iter_id = self.emitter().emit_iter(iter, target_text)?;
        let tag = self.tags.for_loop();

        let fork = self.table.fork(tag);
        let outer = std::mem::replace(&mut self.table, fork);
        let outcome = self.compile_for_body(targets, &iter_id, body);
        let body_exit = std::mem::replace(&mut self.table, outer);
        outcome?;

        // Per-iteration marker, then merge loop-carried names against the
        // pre-loop state.
        self.emitter().emit_foreach(iter)?;
        self.merge_loop(&body_exit)
    }

    /// Loop targets pre-bind inside the fork so body statements see the
    /// per-item ids; the body's first own operation anchors to the iterator.
    fn compile_for_body(&mut self, targets: &[String], iter_id: &str, body: &[Stmt]) -> Result<()> {
        for (index, target) in targets.iter().enumerate() {
            let id = self.table.bind(target);
            let mut op = Operation::new(id, OP_ITER_ITEM);
            op.push_dep(iter_id, "");
            if targets.len() > 1 {
                op = op.with_arg("index", Value::from(index));
            }
            self.ops.push(op)?;
        }
        let mark = self.ops.len();
        self.loop_depth += 1;
        let outcome = self.compile_body(body);
        self.loop_depth -= 1;
        outcome?;
        if self.ops.len() > mark {
            self.ops.anchor(mark, iter_id);
        }
        Ok(())
    }

    fn compile_while(&mut self, test: &TextExpr, body: &[Stmt]) -> Result<()> {
        let cond_id = self.emitter().emit_cond("while", test)?;
        let tag = self.tags.while_loop();

        self.loop_depth += 1;
        let body_exit = self.compile_scope(tag, body, &cond_id);
        self.loop_depth -= 1;

        self.merge_loop(&body_exit?)
    }

    /// Exception handlers fork from the state before the try body and are
    /// discarded afterwards; the success path (body + else + finally)
    /// mutates the working table in place. No PHI joins the paths: exception
    /// edges are not data flow.
    fn compile_try(
        &mut self,
        body: &[Stmt],
        handlers: &[Handler],
        orelse: &[Stmt],
        finally: &[Stmt],
    ) -> Result<()> {
        let pre_try = self.table.clone();
        self.compile_body(body)?;
        self.compile_body(orelse)?;

        for handler in handlers {
            let tag = self.tags.handler();
            let fork = pre_try.fork(tag);
            let outer = std::mem::replace(&mut self.table, fork);
            let outcome = self.compile_body(&handler.body);
            self.table = outer;
            outcome?;
        }

        self.compile_body(finally)
    }

    /// Join a name rebound inside a loop body with its pre-loop id.
    fn merge_loop(&mut self, body_exit: &VariableTable) -> Result<()> {
        for name in VariableTable::diff(&self.table, body_exit) {
            let pre_id = self.table.resolve(&name).map(str::to_string);
            let post_id = body_exit.resolve(&name).map(str::to_string);
            let (Some(pre_id), Some(post_id)) = (pre_id, post_id) else {
                continue;
            };
            self.emit_phi(&name, pre_id, post_id)?;
        }
        Ok(())
    }

    fn emit_phi(&mut self, name: &str, first: String, second: String) -> Result<()> {
        let id = self.table.bind(name);
        let mut op =
            Operation::new(id, OP_PHI).with_arg("var", Value::String(name.to_string()));
        op.push_dep(first, "");
        op.push_dep(second, "");
        self.ops.push(op)
    }

    /// Finish the plan. Output precedence: explicit `output(...)` calls,
    /// else the recorded `return` as `"return"`, else a synthesized null.
    /// A body whose last statement is control flow and that never returned
    /// additionally gets a terminal exit marker.
    pub fn into_plan(mut self, function: &str, trailing_control: bool) -> Result<Plan> {
        let had_return = self.result.is_some();
        let outputs = if !self.outputs.is_empty() {
            std::mem::take(&mut self.outputs)
        } else if let Some(from) = self.result.take() {
            vec![Output {
                from,
                label: "return".to_string(),
            }]
        } else {
            let id = self.table.bind_internal("return_value");
            self.ops
                .push(Operation::new(id.clone(), OP_CONST).with_arg("value", Value::Null))?;
            vec![Output {
                from: id,
                label: "return".to_string(),
            }]
        };

        if !had_return && trailing_control {
            self.emit_loop_exit()?;
        }

        Ok(Plan {
            version: PLAN_VERSION,
            function: Some(function.to_string()),
            ops: self.ops.into_ops(),
            outputs,
            settings: self.settings,
        })
    }
}
