//! C5 — the ASM-level peephole and region scheduler (§4.11).

pub mod cycles;
pub mod peephole;
pub mod scheduler;
pub mod token;

pub use peephole::{AsmPeephole, PeepholeMatch};
pub use scheduler::reorder;
pub use token::{tokenize, tokenize_line, Line, Operand};
