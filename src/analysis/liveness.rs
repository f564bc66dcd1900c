//! Register usage and live-range analysis, shared by register allocation
//! (§4.12), the scheduler's pressure heuristics (§4.6), and the multi-level
//! driver's cost function (§4.1, "peak live-register count").

use crate::common::{Map, Reg};
use crate::ir::Function;

/// A register's live range over the flat instruction vector: `[start,
/// end]`, where `start` is the first definition or first use and `end` is
/// the last use (§4.12).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LiveRange {
    pub start: usize,
    pub end: usize,
}

impl LiveRange {
    pub fn overlaps(&self, other: &LiveRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Compute one live range per register referenced anywhere in `f`.
pub fn live_ranges(f: &Function) -> Map<Reg, LiveRange> {
    let mut ranges: Map<Reg, LiveRange> = Map::new();
    for (i, insn) in f.instructions.iter().enumerate() {
        let mut touch = |r: Reg| {
            ranges
                .entry(r)
                .and_modify(|rg| rg.end = i)
                .or_insert(LiveRange { start: i, end: i });
        };
        if let Some(w) = insn.writes() {
            touch(w);
        }
        for r in insn.reads() {
            touch(r);
        }
    }
    ranges
}

/// The peak number of simultaneously-live registers across `f`, used by the
/// multi-level driver's cost function (§4.1) and the pressure-minimizing
/// scheduler (§4.6).
pub fn peak_pressure(f: &Function) -> usize {
    let ranges = live_ranges(f);
    if ranges.is_empty() {
        return 0;
    }
    let last = f.instructions.len().saturating_sub(1);
    let mut pressure = vec![0usize; last + 1];
    for rg in ranges.values() {
        for slot in pressure.iter_mut().take(rg.end + 1).skip(rg.start) {
            *slot += 1;
        }
    }
    pressure.into_iter().max().unwrap_or(0)
}

/// Reference counts of every register read anywhere in `f`, used by DCE
/// (§4.3) to find destinations that are never read.
pub fn read_counts(f: &Function) -> Map<Reg, usize> {
    let mut counts: Map<Reg, usize> = Map::new();
    for insn in &f.instructions {
        for r in insn.reads() {
            *counts.entry(r).or_insert(0) += 1;
        }
    }
    counts
}
