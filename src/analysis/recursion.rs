//! Recursion detection (§4.10): classify every function's shortest
//! self-returning cycle as direct, mutual, or indirect, and set
//! `IsRecursive` across the module.

use crate::analysis::call_graph::CallGraph;
use crate::common::Id;
use crate::ir::Module;

/// Classification of a function's shortest self-cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecursionKind {
    /// No cycle back to itself.
    NonRecursive,
    /// Cycle of length 1: `f` calls `f` directly.
    Direct,
    /// Cycle of length 2: `f` calls `g` calls `f`.
    Mutual,
    /// Cycle of length >= 3.
    Indirect(usize),
}

#[derive(Clone, Debug)]
pub struct RecursionReport {
    pub function: Id,
    pub kind: RecursionKind,
    /// The shortest cycle's path, starting and ending (implicitly) at
    /// `function`.
    pub cycle: Vec<Id>,
}

/// Run recursion detection over every function in `module`, returning one
/// report per function and setting `Function::is_recursive` along the way.
pub fn detect_recursion(module: &mut Module) -> Vec<RecursionReport> {
    let graph = CallGraph::build(module);
    let names: Vec<Id> = module.functions().map(|f| f.name).collect();

    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let cycle = graph.shortest_self_cycle(name);
        let kind = match &cycle {
            None => RecursionKind::NonRecursive,
            Some(path) => match path.len() {
                1 => RecursionKind::Direct,
                2 => RecursionKind::Mutual,
                n => RecursionKind::Indirect(n),
            },
        };
        if kind != RecursionKind::NonRecursive {
            if let Some(f) = module.function_mut(name) {
                f.is_recursive = true;
            }
        }
        reports.push(RecursionReport {
            function: name,
            kind,
            cycle: cycle.unwrap_or_default(),
        });
    }
    reports
}

/// Render a human-readable summary of a recursion analysis, used by
/// diagnostics when explicitly requested (§4.10: "Diagnostics optionally
/// print the call graph, classified cycles, and a summary").
pub fn summarize(reports: &[RecursionReport]) -> String {
    let mut out = String::new();
    let recursive = reports.iter().filter(|r| r.kind != RecursionKind::NonRecursive).count();
    out.push_str(&format!(
        "{recursive}/{} functions are recursive\n",
        reports.len()
    ));
    for r in reports {
        if r.kind == RecursionKind::NonRecursive {
            continue;
        }
        let kind = match r.kind {
            RecursionKind::Direct => "direct".to_string(),
            RecursionKind::Mutual => "mutual".to_string(),
            RecursionKind::Indirect(n) => format!("indirect, depth {n}"),
            RecursionKind::NonRecursive => unreachable!(),
        };
        let path = r
            .cycle
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        out.push_str(&format!("  {} [{kind}]: {path} -> {}\n", r.function, r.function));
    }
    out
}
