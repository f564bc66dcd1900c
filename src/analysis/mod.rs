//! C2 — analysis: call graph, recursion detection, liveness/register
//! usage, and a loop/dominator approximation (§4.10, §9).

pub mod call_graph;
pub mod liveness;
pub mod loops;
pub mod recursion;

pub use call_graph::CallGraph;
pub use liveness::{live_ranges, peak_pressure, read_counts, LiveRange};
pub use loops::{find_basic_blocks, first_use, has_backward_jump, BasicBlock};
pub use recursion::{detect_recursion, RecursionKind, RecursionReport};
