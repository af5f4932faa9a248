//! Lowering infrastructure - expression emitter and statement compiler

pub mod compiler;
pub mod emitter;

pub use compiler::Compiler;
pub use emitter::Emitter;
