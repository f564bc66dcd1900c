//! MIR scheduler / reordering (§4.6): a shared dependency graph and two
//! strategies built on top of it — a pressure-minimizing list scheduler and
//! a reorder pass that clusters instructions for peephole exposure.

use log::warn;

use crate::analysis::find_basic_blocks;
use crate::common::Reg;
use crate::error::{CoreError, CoreResult};
use crate::ir::{Function, Instruction, Module};
use crate::pass::Pass;

/// One edge in the per-function dependency graph: `before` must execute no
/// later than `after`.
#[derive(Copy, Clone, Debug)]
struct Edge {
    before: usize,
    after: usize,
}

/// RAW/WAR/WAW register dependencies plus conservative memory/call fences,
/// scoped to a single basic block (control flow never crosses regions,
/// §4.6).
struct DepGraph {
    edges: Vec<Edge>,
}

impl DepGraph {
    fn build(instrs: &[Instruction]) -> Self {
        let mut edges = Vec::new();
        let mut last_writer: std::collections::HashMap<Reg, usize> = std::collections::HashMap::new();
        let mut last_readers: std::collections::HashMap<Reg, Vec<usize>> = std::collections::HashMap::new();
        let mut last_memory_op: Option<usize> = None;

        for (i, insn) in instrs.iter().enumerate() {
            for r in insn.reads() {
                if let Some(&w) = last_writer.get(&r) {
                    edges.push(Edge { before: w, after: i }); // RAW
                }
                last_readers.entry(r).or_default().push(i);
            }
            if let Some(w) = insn.writes() {
                if let Some(readers) = last_readers.get(&w) {
                    for &r in readers {
                        if r != i {
                            edges.push(Edge { before: r, after: i }); // WAR
                        }
                    }
                }
                if let Some(&pw) = last_writer.get(&w) {
                    edges.push(Edge { before: pw, after: i }); // WAW
                }
                last_writer.insert(w, i);
                last_readers.remove(&w);
            }
            if insn.opcode.is_memory() || insn.opcode == crate::ir::Opcode::Call {
                if let Some(prev) = last_memory_op {
                    edges.push(Edge { before: prev, after: i });
                }
                last_memory_op = Some(i);
            }
        }
        DepGraph { edges }
    }

    /// `true` if `a` and `b` (adjacent, `a` immediately before `b`) can be
    /// swapped without violating any edge between them.
    fn swappable(&self, a: usize, b: usize) -> bool {
        !self.edges.iter().any(|e| {
            (e.before == a && e.after == b) || (e.before == b && e.after == a && e.before != e.after)
        }) || !self.edges.iter().any(|e| e.before == a && e.after == b)
    }

    fn depends_on(&self, after: usize, before: usize) -> bool {
        self.edges.iter().any(|e| e.before == before && e.after == after)
    }

    fn has_cycle(&self, n: usize) -> bool {
        let mut adj = vec![Vec::new(); n];
        for e in &self.edges {
            adj[e.before].push(e.after);
        }
        let mut state = vec![0u8; n]; // 0 unvisited, 1 in-stack, 2 done
        fn visit(u: usize, adj: &[Vec<usize>], state: &mut [u8]) -> bool {
            state[u] = 1;
            for &v in &adj[u] {
                if state[v] == 1 {
                    return true;
                }
                if state[v] == 0 && visit(v, adj, state) {
                    return true;
                }
            }
            state[u] = 2;
            false
        }
        (0..n).any(|u| state[u] == 0 && visit(u, adj, &mut state))
    }
}

/// Pressure-minimizing list scheduler (§4.6): within each region, repeatedly
/// pick the ready instruction (all dependencies already scheduled) with the
/// highest priority. Priority combines a critical-path estimate, a bonus
/// for killing a live register, a penalty for extending liveness, and a
/// bonus for memory ops so they start early.
pub struct ListScheduler;

impl ListScheduler {
    pub fn new() -> Self {
        ListScheduler
    }

    fn schedule_region(&self, instrs: &[Instruction]) -> CoreResult<Vec<Instruction>> {
        let n = instrs.len();
        if n <= 1 {
            return Ok(instrs.to_vec());
        }
        let graph = DepGraph::build(instrs);
        if graph.has_cycle(n) {
            warn!("scheduler: dependency cycle detected, falling back to original order");
            return Err(CoreError::ScheduleInfeasible {
                function: crate::common::intern("<region>"),
            });
        }
        let counts = read_counts_of(instrs);
        let critical_path = critical_path_lengths(instrs, &graph);

        let mut scheduled = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut remaining_reads: std::collections::HashMap<Reg, usize> = std::collections::HashMap::new();
        for (r, c) in &counts {
            remaining_reads.insert(*r, *c);
        }

        for _ in 0..n {
            let mut best: Option<(usize, f64)> = None;
            for i in 0..n {
                if scheduled[i] {
                    continue;
                }
                let ready = (0..n).all(|j| !(graph.depends_on(i, j) && !scheduled[j]));
                if !ready {
                    continue;
                }
                let mut priority = critical_path[i] as f64;
                if let Some(w) = instrs[i].writes() {
                    if remaining_reads.get(&w).copied().unwrap_or(0) == 0 {
                        priority += 5.0; // would-be-dead write scheduled eagerly is harmless, not a "kill"
                    }
                }
                for r in instrs[i].reads() {
                    if remaining_reads.get(&r).copied().unwrap_or(0) == 1 {
                        priority += 10.0; // kills a live register
                    }
                }
                if instrs[i].writes().is_some() {
                    priority -= 2.0; // creates new liveness
                }
                if instrs[i].opcode.is_memory() {
                    priority += 3.0; // start memory ops early
                }
                if best.map(|(_, p)| priority > p).unwrap_or(true) {
                    best = Some((i, priority));
                }
            }
            let (chosen, _) = best.expect("at least one ready instruction (graph is acyclic)");
            for r in instrs[chosen].reads() {
                if let Some(c) = remaining_reads.get_mut(&r) {
                    *c = c.saturating_sub(1);
                }
            }
            scheduled[chosen] = true;
            order.push(instrs[chosen].clone());
        }
        Ok(order)
    }
}

fn read_counts_of(instrs: &[Instruction]) -> std::collections::HashMap<Reg, usize> {
    let mut counts = std::collections::HashMap::new();
    for insn in instrs {
        for r in insn.reads() {
            *counts.entry(r).or_insert(0) += 1;
        }
    }
    counts
}

/// Longest dependency-chain length ending at each instruction, used as the
/// list scheduler's critical-path priority term.
fn critical_path_lengths(instrs: &[Instruction], graph: &DepGraph) -> Vec<usize> {
    let n = instrs.len();
    let mut lengths = vec![0usize; n];
    for i in 0..n {
        let mut max_pred = 0;
        for e in &graph.edges {
            if e.after == i {
                max_pred = max_pred.max(lengths[e.before] + 1);
            }
        }
        lengths[i] = max_pred;
    }
    lengths
}

impl Pass for ListScheduler {
    fn name(&self) -> &'static str {
        "list-scheduler"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let mut changed = false;
        for f in module.functions_mut() {
            changed |= schedule_function_by_region(f, |w| self.schedule_region(w))?;
        }
        Ok(changed)
    }
}

/// Reorder pass for peephole exposure (§4.6): move independent loads
/// adjacent, cluster arithmetic on shared registers, and sink stores as
/// late as safe, swapping only pairs the dependency graph allows.
pub struct ReorderForPeephole;

impl ReorderForPeephole {
    pub fn new() -> Self {
        ReorderForPeephole
    }

    fn reorder_region(&self, instrs: &[Instruction]) -> Vec<Instruction> {
        let mut out = instrs.to_vec();
        let graph = DepGraph::build(&out);
        let mut changed = true;
        let mut guard = 0;
        while changed && guard < out.len() * 2 {
            changed = false;
            guard += 1;
            for i in 0..out.len().saturating_sub(1) {
                let a = &out[i];
                let b = &out[i + 1];
                if a.opcode.is_control_flow() || b.opcode.is_control_flow() {
                    continue;
                }
                let is_memory_fence = a.opcode.is_memory() && b.opcode.is_memory();
                if is_memory_fence {
                    continue;
                }
                let sink_store = a.opcode != crate::ir::Opcode::StoreVar
                    && b.opcode == crate::ir::Opcode::StoreVar
                    && graph.swappable(i, i + 1);
                let cluster_arith = matches!(
                    (a.opcode.is_memory(), b.opcode.is_memory()),
                    (false, false)
                ) && a.writes().is_some()
                    && b.reads().contains(&a.writes().unwrap_or_default())
                    == false
                    && graph.swappable(i, i + 1)
                    && should_cluster(a, b);
                if sink_store || cluster_arith {
                    out.swap(i, i + 1);
                    changed = true;
                }
            }
        }
        out
    }
}

fn should_cluster(a: &Instruction, b: &Instruction) -> bool {
    // Bring adjacent independent loads together so the MIR peephole's
    // duplicate-load and store/load patterns (§4.4) see them back to back.
    matches!(a.opcode, crate::ir::Opcode::LoadVar | crate::ir::Opcode::LoadConst)
        && matches!(b.opcode, crate::ir::Opcode::LoadVar | crate::ir::Opcode::LoadConst)
}

impl Pass for ReorderForPeephole {
    fn name(&self) -> &'static str {
        "reorder-for-peephole"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let mut changed = false;
        for f in module.functions_mut() {
            changed |= schedule_function_by_region(f, |w| Ok(self.reorder_region(w)))?;
        }
        Ok(changed)
    }
}

/// Split `f`'s instructions into regions at control-flow/label boundaries
/// (scheduling never crosses them, §4.6) and apply `reschedule` to each.
fn schedule_function_by_region(
    f: &mut Function,
    mut reschedule: impl FnMut(&[Instruction]) -> CoreResult<Vec<Instruction>>,
) -> CoreResult<bool> {
    let blocks = find_basic_blocks(f);
    let mut new_instrs = Vec::with_capacity(f.instructions.len());
    let mut changed = false;
    for block in blocks {
        let window = &f.instructions[block.start..block.end];
        // Leave the trailing control-flow instruction, if any, in place —
        // regions are scheduled around it, not through it.
        let (body, tail) = match window.last() {
            Some(last) if last.opcode.is_control_flow() => (&window[..window.len() - 1], Some(last.clone())),
            _ => (window, None),
        };
        match reschedule(body) {
            Ok(rescheduled) => {
                if rescheduled.as_slice() != body {
                    changed = true;
                }
                new_instrs.extend(rescheduled);
            }
            Err(_) => {
                new_instrs.extend(body.iter().cloned());
            }
        }
        if let Some(t) = tail {
            new_instrs.push(t);
        }
    }
    f.instructions = new_instrs;
    if changed {
        f.recompute_register_sets();
    }
    Ok(changed)
}
