//! Determinism detection (§6 GLOSSARY "Hybrid recording"): compare two
//! traces of the same recorded scenario and report where, and why, they
//! first diverge. A divergence at an [`EventKind::SmcPatch`] is reported
//! distinctly from an ordinary data mismatch, since a patch landing at a
//! different cycle or address is almost always a TRUE-SMC/SMC bug rather
//! than incidental nondeterminism (uninitialized memory, unseeded RNG, ...).

use crate::tas::event::{Event, EventKind};
use crate::tas::format::TasFile;

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Deterministic,
    Diverged {
        index: usize,
        cycle: u64,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeterminismReport {
    pub verdict: Verdict,
}

impl DeterminismReport {
    pub fn is_deterministic(&self) -> bool {
        matches!(self.verdict, Verdict::Deterministic)
    }
}

fn describe_mismatch(a: &EventKind, b: &EventKind) -> String {
    match (a, b) {
        (EventKind::SmcPatch { addr: addr_a, .. }, EventKind::SmcPatch { addr: addr_b, .. }) if addr_a != addr_b => {
            format!("SMC patch landed at different addresses ({addr_a:#06x} vs {addr_b:#06x})")
        }
        (EventKind::SmcPatch { .. }, other) | (other, EventKind::SmcPatch { .. }) => {
            format!("SMC patch expected but observed {other:?} instead")
        }
        _ => format!("events differ: {a:?} vs {b:?}"),
    }
}

/// Compare two event traces recorded from (nominally) identical runs.
pub fn compare(a: &[Event], b: &[Event]) -> DeterminismReport {
    for (i, pair) in a.iter().zip(b.iter()).enumerate() {
        let (left, right) = pair;
        if left.cycle != right.cycle || left.kind != right.kind {
            let reason = if left.cycle != right.cycle {
                format!("cycle mismatch: {} vs {}", left.cycle, right.cycle)
            } else {
                describe_mismatch(&left.kind, &right.kind)
            };
            return DeterminismReport {
                verdict: Verdict::Diverged {
                    index: i,
                    cycle: left.cycle,
                    reason,
                },
            };
        }
    }
    if a.len() != b.len() {
        let index = a.len().min(b.len());
        let cycle = a.get(index).or(b.get(index)).map(|e| e.cycle).unwrap_or(0);
        return DeterminismReport {
            verdict: Verdict::Diverged {
                index,
                cycle,
                reason: format!("trace lengths differ: {} vs {} events", a.len(), b.len()),
            },
        };
    }
    DeterminismReport {
        verdict: Verdict::Deterministic,
    }
}

/// Structural sanity check on a single recorded file, independent of any
/// comparison: cycles must be non-decreasing and every snapshot must
/// precede the first event it could be replayed forward from.
pub fn check_internal_consistency(file: &TasFile) -> Result<(), String> {
    let mut last_cycle = 0u64;
    for e in &file.events {
        if e.cycle < last_cycle {
            return Err(format!(
                "event cycle {} precedes previous event cycle {}",
                e.cycle, last_cycle
            ));
        }
        last_cycle = e.cycle;
    }
    let mut last_snapshot_cycle = 0u64;
    for s in &file.snapshots {
        if s.cycle < last_snapshot_cycle {
            return Err(format!(
                "snapshot cycle {} precedes previous snapshot cycle {}",
                s.cycle, last_snapshot_cycle
            ));
        }
        last_snapshot_cycle = s.cycle;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_traces_are_deterministic() {
        let a = vec![Event::new(1, EventKind::MemoryWrite { addr: 1, value: 1 })];
        let b = a.clone();
        assert!(compare(&a, &b).is_deterministic());
    }

    #[test]
    fn smc_patch_at_a_different_address_is_flagged_by_name() {
        let a = vec![Event::new(10, EventKind::SmcPatch { addr: 0x8000, old: 0, new: 1 })];
        let b = vec![Event::new(10, EventKind::SmcPatch { addr: 0x8010, old: 0, new: 1 })];
        let report = compare(&a, &b);
        match report.verdict {
            Verdict::Diverged { reason, .. } => assert!(reason.contains("SMC patch")),
            Verdict::Deterministic => panic!("expected a divergence"),
        }
    }

    #[test]
    fn mismatched_lengths_diverge_at_the_shorter_length() {
        let a = vec![Event::new(1, EventKind::MemoryWrite { addr: 0, value: 1 })];
        let b = vec![];
        let report = compare(&a, &b);
        assert!(!report.is_deterministic());
    }

    #[test]
    fn out_of_order_events_fail_consistency() {
        let mut file = TasFile::new();
        file.events.push(Event::new(10, EventKind::MemoryWrite { addr: 0, value: 1 }));
        file.events.push(Event::new(5, EventKind::MemoryWrite { addr: 0, value: 2 }));
        assert!(check_internal_consistency(&file).is_err());
    }
}
