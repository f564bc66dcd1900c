//! The back-end: a thin textual Z80 codegen bridge (§6).

pub mod codegen;

pub use codegen::{emit_function, emit_module};
