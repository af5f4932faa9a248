//! Lowering domain - the operation arena

pub mod arena;

pub use arena::OpArena;
