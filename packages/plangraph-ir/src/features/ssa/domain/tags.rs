//! Scope-context tag ordinals
//!
//! Tags (`then1`, `else1`, `loop2`, ...) mark which forked scope an SSA id
//! was minted in. The ordinals are owned by the compilation as a whole, not
//! by any [`VariableTable`](super::table::VariableTable) fork, so a tag is
//! issued exactly once even when scopes nest or repeat.

/// Per-kind ordinal counters for scope-context tags.
#[derive(Debug, Default)]
pub struct ScopeTags {
    branches: u32,
    loops: u32,
    whiles: u32,
    excepts: u32,
}

impl ScopeTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags for the two arms of a conditional; the pair shares one ordinal.
    pub fn branch(&mut self) -> (String, String) {
        self.branches += 1;
        (
            format!("then{}", self.branches),
            format!("else{}", self.branches),
        )
    }

    pub fn for_loop(&mut self) -> String {
        self.loops += 1;
        format!("loop{}", self.loops)
    }

    pub fn while_loop(&mut self) -> String {
        self.whiles += 1;
        format!("while{}", self.whiles)
    }

    pub fn handler(&mut self) -> String {
        self.excepts += 1;
        format!("except{}", self.excepts)
    }
}
