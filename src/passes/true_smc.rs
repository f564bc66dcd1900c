//! TRUE-SMC anchors (§4.7).
//!
//! For each parameter of an SMC-eligible, non-recursive function, find the
//! instruction that first uses it (the dominator-approximation anchor,
//! [`crate::analysis::first_use`]). If that instruction can carry the value
//! as an immediate, it becomes the anchor directly; otherwise a synthetic
//! `SMCLoadConst` is inserted ahead of it. Every `LoadParam i` is rewritten
//! to `TrueSMCLoad` and the module's patch table gains one entry per bound
//! parameter.

use log::debug;

use crate::common::{intern, Id, Map};
use crate::error::CoreResult;
use crate::ir::patch_table::PatchEntry;
use crate::ir::{Function, Instruction, Module, Opcode};
use crate::pass::Pass;

#[derive(Default)]
pub struct TrueSmc;

impl TrueSmc {
    pub fn new() -> Self {
        TrueSmc
    }

    /// Opcodes whose `src1`/`src2` operand can be re-expressed as an
    /// immediate, making the instruction itself usable as an anchor rather
    /// than requiring a synthetic `SMCLoadConst` ahead of it.
    fn can_host_immediate(insn: &Instruction) -> bool {
        matches!(
            insn.opcode,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Eq
                | Opcode::Ne
                | Opcode::Lt
                | Opcode::Gt
                | Opcode::Le
                | Opcode::Ge
                | Opcode::Cmp
        )
    }

    fn eligible(f: &Function) -> bool {
        f.is_smc_enabled && !f.is_recursive && !f.is_interrupt
    }

    fn run_function(&self, f: &mut Function, patch_table: &mut crate::ir::patch_table::PatchTable) -> bool {
        if !Self::eligible(f) {
            return false;
        }
        let mut anchor_symbols: Map<Id, Id> = Map::new();
        let mut direct_hosts: Vec<(usize, Id)> = Vec::new();
        let mut insertions: Vec<(usize, Instruction)> = Vec::new();

        for (param_idx, param) in f.params.iter().enumerate() {
            let param_reg = crate::common::Reg(param_idx as u32 + 1);
            let Some(use_idx) = crate::analysis::first_use(f, param_reg) else {
                continue; // parameter never used in the body; no anchor needed
            };
            let anchor = intern(format!("{}$imm{param_idx}", param.name));
            let use_insn = &f.instructions[use_idx];
            if Self::can_host_immediate(use_insn) {
                // The use site itself becomes the anchor: no synthetic load
                // is inserted ahead of it, it is just tagged with the label
                // the external assembler patches.
                direct_hosts.push((use_idx, anchor));
            } else {
                let mut insn = Instruction::new(Opcode::SMCLoadConst)
                    .with_dest(param_reg)
                    .with_comment(format!("TRUE-SMC anchor for `{}`", param.name));
                insn.smc_label = Some(anchor);
                insertions.push((use_idx, insn));
            }
            anchor_symbols.insert(param.name, anchor);
        }

        if anchor_symbols.is_empty() {
            return false;
        }

        // Tag direct hosts before any insertion shifts indices — the
        // indices collected above are only valid against the pre-insertion
        // instruction list.
        for (idx, anchor) in direct_hosts {
            f.instructions[idx].smc_label = Some(anchor);
        }

        // Insert synthetic anchors back-to-front so earlier indices stay valid.
        for (idx, insn) in insertions.into_iter().rev() {
            f.instructions.insert(idx, insn);
        }

        // Rewrite every LoadParam i to TrueSMCLoad referencing its anchor.
        for insn in f.instructions.iter_mut() {
            if insn.opcode == Opcode::LoadParam {
                let idx = insn.imm as usize;
                if let Some(param) = f.params.get(idx) {
                    if let Some(&anchor) = anchor_symbols.get(&param.name) {
                        insn.opcode = Opcode::TrueSMCLoad;
                        insn.symbol = Some(anchor);
                    }
                }
            }
        }

        for param in f.params.iter_mut() {
            if anchor_symbols.contains_key(&param.name) {
                param.is_tsmc_ref = true;
            }
        }

        for (param_name, anchor) in &anchor_symbols {
            let size = 1; // all parameters modeled here are 8-bit (§3); widened once 16-bit params exist
            patch_table.insert(PatchEntry {
                symbol: *anchor,
                size,
                parameter_name: *param_name,
                function: f.name,
                address: None,
                bank: None,
            });
            debug!("TRUE-SMC anchor `{anchor}` bound to `{}`.{param_name}", f.name);
        }

        f.uses_true_smc = true;
        f.calling_convention = crate::ir::function::CallingConvention::TrueSMC;
        f.recompute_register_sets();
        true
    }
}

impl Pass for TrueSmc {
    fn name(&self) -> &'static str {
        "true-smc"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let mut changed = false;
        let mut patch_table = module.patch_table.clone();
        for f in module.functions_mut() {
            changed |= self.run_function(f, &mut patch_table);
        }
        module.patch_table = patch_table;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Reg;
    use crate::ir::Param;

    #[test]
    fn parameter_used_in_add_becomes_an_anchor() {
        let mut f = Function::new(intern("inc_by"), vec![Param::new(intern("n"), intern("u8"))]);
        f.next_register = 3;
        f.is_smc_enabled = true;
        f.instructions = vec![
            Instruction::new(Opcode::LoadParam).with_dest(Reg(1)).with_imm(0),
            Instruction::binop(Opcode::Add, Reg(2), Reg(1), Reg(1)),
            Instruction::ret(Reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = TrueSmc::new().run(&mut module).unwrap();
        assert!(changed);

        let f = module.function(intern("inc_by")).unwrap();
        assert!(f.uses_true_smc);
        assert!(f.instructions.iter().any(|i| i.opcode == Opcode::TrueSMCLoad));
        assert_eq!(module.patch_table.len(), 1);
        let anchor = module.patch_table.entries()[0].symbol;
        assert_eq!(module.patch_table.entries()[0].parameter_name, intern("n"));
        // the Add itself hosts the anchor directly; no synthetic load precedes it
        assert!(f.instructions.iter().any(|i| i.opcode == Opcode::Add && i.smc_label == Some(anchor)));
        assert!(!f.instructions.iter().any(|i| i.opcode == Opcode::SMCLoadConst));
    }

    #[test]
    fn parameter_used_in_a_non_immediate_context_gets_a_synthetic_anchor() {
        let mut f = Function::new(intern("identity"), vec![Param::new(intern("n"), intern("u8"))]);
        f.next_register = 3;
        f.is_smc_enabled = true;
        f.instructions = vec![
            Instruction::new(Opcode::LoadParam).with_dest(Reg(1)).with_imm(0),
            Instruction::mov(Reg(2), Reg(1)),
            Instruction::ret(Reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = TrueSmc::new().run(&mut module).unwrap();
        assert!(changed);

        let f = module.function(intern("identity")).unwrap();
        assert_eq!(module.patch_table.len(), 1);
        let anchor = module.patch_table.entries()[0].symbol;
        assert!(f
            .instructions
            .iter()
            .any(|i| i.opcode == Opcode::SMCLoadConst && i.smc_label == Some(anchor)));
    }

    #[test]
    fn recursive_functions_are_skipped() {
        let mut f = Function::new(intern("rec"), vec![Param::new(intern("n"), intern("u8"))]);
        f.next_register = 2;
        f.is_smc_enabled = true;
        f.is_recursive = true;
        f.instructions = vec![
            Instruction::new(Opcode::LoadParam).with_dest(Reg(1)).with_imm(0),
            Instruction::ret(Reg(1)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = TrueSmc::new().run(&mut module).unwrap();
        assert!(!changed);
    }
}
