//! The call graph (§4.10, §9): an explicit adjacency map built by scanning
//! every `Call` instruction in every function.

use crate::common::{Id, Map, Set};
use crate::ir::{Module, Opcode};

/// An adjacency-map call graph over a module's functions. Edges point from
/// caller to callee; short-to-fully-qualified name resolution (§4.10) is
/// modeled as a no-op here since this core's `Id`s are already the
/// resolved, fully-qualified names the semantic analyzer hands us — the
/// lookup step exists so a future frontend with a scoping mechanism has a
/// single seam to hook into.
#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    edges: Map<Id, Set<Id>>,
}

impl CallGraph {
    /// Build the call graph by scanning every function's instructions.
    /// Calls to names the module has not declared anywhere (typos, or
    /// genuinely missing externs) are skipped rather than treated as an
    /// error — `ir::validate_module` is the place that surfaces that as a
    /// `StructuralError`.
    pub fn build(module: &Module) -> Self {
        let mut edges: Map<Id, Set<Id>> = Map::new();
        for f in module.functions() {
            let callees = edges.entry(f.name).or_default();
            for insn in &f.instructions {
                if insn.opcode == Opcode::Call {
                    if let Some(callee) = insn.symbol {
                        if module.is_declared(callee) {
                            callees.insert(callee);
                        }
                    }
                }
            }
        }
        CallGraph { edges }
    }

    pub fn callees(&self, f: Id) -> impl Iterator<Item = Id> + '_ {
        self.edges.get(&f).into_iter().flatten().copied()
    }

    pub fn contains(&self, f: Id) -> bool {
        self.edges.contains_key(&f)
    }

    /// Resolve the shortest cycle starting and ending at `f`, if one
    /// exists, via DFS with an explicit path stack (§9: "no language-level
    /// cycle support is needed").
    pub fn shortest_self_cycle(&self, f: Id) -> Option<Vec<Id>> {
        let mut best: Option<Vec<Id>> = None;
        let mut path = vec![f];
        let mut visited = Set::new();
        self.dfs_cycles(f, f, &mut path, &mut visited, &mut best);
        best
    }

    fn dfs_cycles(
        &self,
        start: Id,
        current: Id,
        path: &mut Vec<Id>,
        visited: &mut Set<Id>,
        best: &mut Option<Vec<Id>>,
    ) {
        for callee in self.callees(current) {
            if callee == start {
                let candidate = path.clone();
                if best.as_ref().map(|b| candidate.len() < b.len()).unwrap_or(true) {
                    *best = Some(candidate);
                }
                continue;
            }
            if visited.contains(&callee) {
                continue;
            }
            // Bound the walk: a path longer than the module can't find a
            // shorter cycle than one already found, and prevents runaway
            // recursion on pathological graphs.
            if let Some(b) = best {
                if path.len() + 1 >= b.len() {
                    continue;
                }
            }
            visited.insert(callee);
            path.push(callee);
            self.dfs_cycles(start, callee, path, visited, best);
            path.pop();
            visited.remove(&callee);
        }
    }
}
