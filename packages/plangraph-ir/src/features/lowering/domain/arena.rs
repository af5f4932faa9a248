//! Append-only operation arena
//!
//! Collects emitted operations in order and enforces the plan ceiling at
//! every append, so an oversized source fails mid-compile instead of
//! producing a truncated graph.

use tracing::trace;

use crate::errors::{DslViolation, Result, MAX_OPERATIONS};
use crate::shared::models::plan::Operation;

#[derive(Debug, Default)]
pub struct OpArena {
    ops: Vec<Operation>,
}

impl OpArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation; fails once the ceiling is crossed.
    pub fn push(&mut self, op: Operation) -> Result<()> {
        if self.ops.len() >= MAX_OPERATIONS {
            return Err(DslViolation::PlanTooLarge(self.ops.len() + 1));
        }
        trace!(id = %op.id, op = %op.op, deps = op.deps.len(), "emit");
        self.ops.push(op);
        Ok(())
    }

    /// Look up an emitted operation by id.
    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.ops.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Add a control edge to the operation at `index` unless it already
    /// depends on `dep`. Used to anchor a scope's first operation to the
    /// condition or iterator guarding it.
    pub fn anchor(&mut self, index: usize, dep: &str) {
        if let Some(op) = self.ops.get_mut(index) {
            if !op.depends_on(dep) {
                op.push_dep(dep, "");
            }
        }
    }

    pub fn into_ops(self) -> Vec<Operation> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_fails_past_ceiling() {
        let mut arena = OpArena::new();
        for i in 0..MAX_OPERATIONS {
            arena
                .push(Operation::new(format!("c_{i}"), "CONST.value"))
                .unwrap();
        }
        let err = arena
            .push(Operation::new("c_overflow", "CONST.value"))
            .unwrap_err();
        assert!(matches!(err, DslViolation::PlanTooLarge(n) if n == MAX_OPERATIONS + 1));
        assert_eq!(arena.len(), MAX_OPERATIONS);
    }

    #[test]
    fn test_anchor_adds_control_edge_once() {
        let mut arena = OpArena::new();
        arena.push(Operation::new("cond_1", "COND.eval")).unwrap();
        arena.push(Operation::new("x_1", "AG.go")).unwrap();

        arena.anchor(1, "cond_1");
        arena.anchor(1, "cond_1");

        let op = arena.get("x_1").unwrap();
        assert_eq!(op.deps, vec!["cond_1"]);
        assert_eq!(op.dep_labels, vec![""]);
    }
}
