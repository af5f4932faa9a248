//! SSA variable table
//!
//! Owns the logical-name → current-id binding map and the per-name version
//! counters behind every SSA id in a plan. Ids look like `x_2` at the top
//! level and `x_2@then1` inside a forked scope; the version counter is
//! per-name and monotonic within one table, and scope tags keep ids from
//! sibling or nested scopes distinct, so two bindings of the same logical
//! name never collide.

use rustc_hash::FxHashMap;

/// Versioned name bindings for one scope of a compilation.
///
/// Entering a branch, loop body, or except handler forks the table (deep
/// copy); the fork is reconciled via [`VariableTable::diff`] or discarded
/// when the scope closes. The context stack is strictly LIFO and ids minted
/// mid-scope carry only the innermost tag.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    /// Logical name → latest SSA id
    bindings: FxHashMap<String, String>,

    /// Per-name version counters, never reset
    versions: FxHashMap<String, u32>,

    /// Active scope-context tags, innermost last
    context: Vec<String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh id for `name` and record it as the latest binding.
    pub fn bind(&mut self, name: &str) -> String {
        let id = self.mint(name);
        self.bindings.insert(name.to_string(), id.clone());
        id
    }

    /// Mint a fresh id for an internal name (`cond`, `const`, `phi`, ...)
    /// without touching the binding map, so synthesized ids can never shadow
    /// a user variable that happens to share the name.
    pub fn bind_internal(&mut self, name: &str) -> String {
        self.mint(name)
    }

    /// Rebind `name` to an id minted earlier (`x = y`, ternary results).
    pub fn alias(&mut self, name: &str, id: &str) {
        self.bindings.insert(name.to_string(), id.to_string());
    }

    /// Latest binding for `name`, if any.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|s| s.as_str())
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Deep copy with `tag` pushed as the innermost scope context.
    pub fn fork(&self, tag: impl Into<String>) -> Self {
        let mut forked = self.clone();
        forked.context.push(tag.into());
        forked
    }

    /// Names bound in both snapshots whose latest ids differ, sorted so phi
    /// emission order is deterministic. Names present in only one snapshot
    /// are excluded: a binding created in a single branch does not escape.
    pub fn diff(a: &Self, b: &Self) -> Vec<String> {
        let mut changed: Vec<String> = a
            .bindings
            .iter()
            .filter(|(name, id)| b.bindings.get(*name).is_some_and(|other| other != *id))
            .map(|(name, _)| name.clone())
            .collect();
        changed.sort();
        changed
    }

    fn mint(&mut self, name: &str) -> String {
        let version = self.versions.entry(name.to_string()).or_insert(0);
        *version += 1;
        match self.context.last() {
            Some(tag) => format!("{name}_{version}@{tag}"),
            None => format!("{name}_{version}"),
        }
    }
}
