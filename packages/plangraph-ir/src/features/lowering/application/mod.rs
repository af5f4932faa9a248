//! Lowering application - the compile-source use case

pub mod assemble;

pub use assemble::compile_source;
