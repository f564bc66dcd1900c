//! Linear-scan register allocation (§4.12): attaches [`PhysReg`] side
//! metadata to each instruction's operands without renumbering the logical
//! register it's attached to.

use crate::analysis::{live_ranges, LiveRange};
use crate::common::{Map, Reg};
use crate::error::CoreResult;
use crate::ir::{Function, Instruction, Module, Opcode, PhysReg};
use crate::pass::Pass;

const EIGHT_BIT_POOL: [PhysReg; 7] = [
    PhysReg::A,
    PhysReg::B,
    PhysReg::C,
    PhysReg::D,
    PhysReg::E,
    PhysReg::H,
    PhysReg::L,
];
const SIXTEEN_BIT_POOL: [PhysReg; 3] = [PhysReg::HL, PhysReg::DE, PhysReg::BC];

/// Which operand mix dominates a function, to decide allocation order
/// (§4.12: "if arithmetic/logical ops dominate, prefer A-first; if 16-bit
/// ops dominate, prefer HL,DE,BC; otherwise spread across 8-bit registers").
#[derive(Copy, Clone, PartialEq, Eq)]
enum Profile {
    ArithmeticHeavy,
    WideHeavy,
    Mixed,
}

fn profile(f: &Function) -> Profile {
    let mut arith = 0usize;
    let mut wide = 0usize;
    for insn in &f.instructions {
        if insn.opcode.is_binary_foldable() || insn.opcode.is_unary_foldable() {
            arith += 1;
        }
        if matches!(insn.opcode, Opcode::Call) {
            wide += 1; // call arguments/results commonly pass through HL/DE/BC
        }
    }
    if arith > f.instructions.len() / 2 {
        Profile::ArithmeticHeavy
    } else if wide > f.instructions.len() / 4 {
        Profile::WideHeavy
    } else {
        Profile::Mixed
    }
}

fn allocation_order(p: Profile) -> Vec<PhysReg> {
    match p {
        Profile::ArithmeticHeavy => {
            let mut v = vec![PhysReg::A];
            v.extend(EIGHT_BIT_POOL.iter().filter(|&&r| r != PhysReg::A));
            v.extend(SIXTEEN_BIT_POOL);
            v
        }
        Profile::WideHeavy => {
            let mut v = SIXTEEN_BIT_POOL.to_vec();
            v.extend(EIGHT_BIT_POOL);
            v
        }
        Profile::Mixed => {
            let mut v = EIGHT_BIT_POOL.to_vec();
            v.extend(SIXTEEN_BIT_POOL);
            v
        }
    }
}

#[derive(Default)]
pub struct RegAlloc;

impl RegAlloc {
    pub fn new() -> Self {
        RegAlloc
    }

    /// Classic linear scan: sort live ranges by start, keep an active set of
    /// currently-occupied physical registers, free any whose range has ended
    /// by the new range's start, and assign the first free register in
    /// preference order. Ranges with no register free are left unallocated
    /// (deferred spill, §4.12) rather than forced onto a register.
    fn assign(&self, f: &Function) -> Map<Reg, PhysReg> {
        let ranges = live_ranges(f);
        let mut by_start: Vec<(Reg, LiveRange)> = ranges.into_iter().collect();
        by_start.sort_by_key(|(_, r)| r.start);

        let order = allocation_order(profile(f));
        let mut active: Vec<(LiveRange, PhysReg)> = Vec::new();
        let mut assignment = Map::new();

        for (reg, range) in by_start {
            active.retain(|(r, _)| r.end >= range.start);
            let taken: Vec<PhysReg> = active.iter().map(|(_, p)| *p).collect();
            if let Some(&phys) = order.iter().find(|p| !taken.contains(p)) {
                active.push((range, phys));
                assignment.insert(reg, phys);
            }
            // else: left unallocated, deferred spill.
        }
        assignment
    }

    fn apply(&self, f: &mut Function, assignment: &Map<Reg, PhysReg>) -> bool {
        let mut changed = false;
        for insn in f.instructions.iter_mut() {
            changed |= set_if_present(&mut insn.phys_dest, insn.dest, assignment);
            changed |= set_if_present(&mut insn.phys_src1, insn.src1, assignment);
            changed |= set_if_present(&mut insn.phys_src2, insn.src2, assignment);
        }
        changed
    }
}

fn set_if_present(slot: &mut Option<PhysReg>, reg: Reg, assignment: &Map<Reg, PhysReg>) -> bool {
    if reg.is_none() {
        return false;
    }
    match assignment.get(&reg) {
        Some(&phys) if *slot != Some(phys) => {
            *slot = Some(phys);
            true
        }
        _ => false,
    }
}

impl Pass for RegAlloc {
    fn name(&self) -> &'static str {
        "regalloc"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let mut changed = false;
        for f in module.functions_mut() {
            let assignment = self.assign(f);
            changed |= self.apply(f, &assignment);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::intern;
    use crate::ir::{Function, Instruction};

    fn reg(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn non_overlapping_ranges_share_no_physical_register() {
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::load_const(reg(1), 1),
            Instruction::ret(reg(1)),
            Instruction::load_const(reg(2), 2),
            Instruction::ret(reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = RegAlloc::new().run(&mut module).unwrap();
        assert!(changed);
        let f = module.function(intern("f")).unwrap();
        assert!(f.instructions[0].phys_dest.is_some());
        assert!(f.instructions[2].phys_dest.is_some());
    }

    #[test]
    fn overlapping_ranges_get_distinct_registers() {
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::load_const(reg(1), 1),
            Instruction::load_const(reg(2), 2),
            Instruction::binop(Opcode::Add, reg(1), reg(1), reg(2)),
            Instruction::ret(reg(1)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        RegAlloc::new().run(&mut module).unwrap();
        let f = module.function(intern("f")).unwrap();
        let p1 = f.instructions[0].phys_dest;
        let p2 = f.instructions[1].phys_dest;
        assert!(p1.is_some() && p2.is_some());
        assert_ne!(p1, p2);
    }
}
