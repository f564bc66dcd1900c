//! Loop and dominator approximation (§9): "Dominators / loops are
//! approximated by flat instruction-vector heuristics (backward jumps =
//! loop back-edges; label positions delimit basic blocks)." A full
//! dominator tree is optional and not built here; this module gives the
//! inliner (§4.5) and TRUE-SMC (§4.7) exactly the heuristics the spec asks
//! for, nothing more.

use crate::common::{Id, Set};
use crate::ir::{Function, Opcode};

/// `true` if `f` contains a backward jump: a `Jump`/`JumpIf`/`JumpIfNot`
/// whose target label is defined at or before the jump's own index. Used
/// by the inliner's loop-free predicate (§4.5).
pub fn has_backward_jump(f: &Function) -> bool {
    let mut seen_labels: Set<Id> = Set::new();
    for insn in &f.instructions {
        match insn.opcode {
            Opcode::Label => {
                if let Some(label) = insn.label {
                    seen_labels.insert(label);
                }
            }
            Opcode::Jump | Opcode::JumpIf | Opcode::JumpIfNot => {
                if let Some(target) = insn.label {
                    if seen_labels.contains(&target) {
                        return true;
                    }
                }
            }
            _ => {}
        }
    }
    false
}

/// Basic blocks delimited by label positions and control-flow instructions,
/// used as the "dominator approximation" for TRUE-SMC anchor placement
/// (§4.7) and as scheduling regions (§4.6, §4.11).
#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub start: usize,
    /// Exclusive end index.
    pub end: usize,
}

/// Partition `f`'s instructions into basic blocks. A new block starts after
/// every control-flow instruction and at every `Label`.
pub fn find_basic_blocks(f: &Function) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut start = 0;
    for (i, insn) in f.instructions.iter().enumerate() {
        let starts_new_block = insn.opcode == Opcode::Label && i != start;
        if starts_new_block {
            blocks.push(BasicBlock { start, end: i });
            start = i;
        }
        if insn.opcode.is_control_flow() && insn.opcode != Opcode::Label {
            blocks.push(BasicBlock { start, end: i + 1 });
            start = i + 1;
        }
    }
    if start < f.instructions.len() {
        blocks.push(BasicBlock {
            start,
            end: f.instructions.len(),
        });
    }
    blocks
}

/// The first instruction index (in program order, our dominator
/// approximation) that reads parameter register `reg`. This is the
/// "anchor" search TRUE-SMC (§4.7) performs before falling back to
/// inserting a synthetic `SMCLoadConst`.
pub fn first_use(f: &Function, reg: crate::common::Reg) -> Option<usize> {
    f.instructions.iter().position(|insn| insn.reads().contains(&reg))
}
