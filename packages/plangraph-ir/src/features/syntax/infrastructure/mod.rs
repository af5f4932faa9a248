//! Syntax infrastructure - tree-sitter backed reading

pub mod literal;
pub mod reader;

pub use reader::Reader;
