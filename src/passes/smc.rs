//! Self-modifying code, non-anchor variant (§4.8).
//!
//! Independent of [`crate::passes::true_smc`]: a candidate register (backed
//! by `LoadConst` or `LoadParam`) read at least twice and written at most
//! three times becomes `SMCLoadConst` with a generated label; each later
//! write to that register becomes `SMCStoreConst` patching the label.
//! Recursive or SMC-disabled functions are skipped.

use log::debug;

use crate::common::{intern, Map, Reg};
use crate::config::PipelineConfig;
use crate::error::CoreResult;
use crate::ir::{Function, Module, Opcode};
use crate::pass::Pass;

pub struct Smc {
    min_reads: usize,
    max_writes: usize,
}

impl Smc {
    pub fn new(config: &PipelineConfig) -> Self {
        Smc {
            min_reads: config.smc_min_reads,
            max_writes: config.smc_max_writes,
        }
    }

    fn eligible(f: &Function) -> bool {
        f.is_smc_enabled && !f.is_recursive
    }

    fn run_function(&self, f: &mut Function) -> bool {
        if !Self::eligible(f) {
            return false;
        }

        let mut reads: Map<Reg, usize> = Map::new();
        let mut writer_indices: Map<Reg, Vec<usize>> = Map::new();
        for (i, insn) in f.instructions.iter().enumerate() {
            for r in insn.reads() {
                *reads.entry(r).or_insert(0) += 1;
            }
            if matches!(insn.opcode, Opcode::LoadConst | Opcode::LoadParam) {
                if let Some(w) = insn.writes() {
                    writer_indices.entry(w).or_default().push(i);
                }
            }
        }

        let candidates: Vec<Reg> = writer_indices
            .iter()
            .filter(|(r, defs)| {
                reads.get(r).copied().unwrap_or(0) >= self.min_reads && defs.len() <= self.max_writes
            })
            .map(|(r, _)| *r)
            .collect();

        if candidates.is_empty() {
            return false;
        }

        for reg in candidates {
            let label = intern(format!("smc_{}_{}", f.name, reg.0));
            let defs = writer_indices.get(&reg).cloned().unwrap_or_default();
            for (occurrence, &idx) in defs.iter().enumerate() {
                let insn = &mut f.instructions[idx];
                if occurrence == 0 {
                    insn.opcode = Opcode::SMCLoadConst;
                    insn.smc_label = Some(label);
                } else {
                    insn.opcode = Opcode::SMCStoreConst;
                    insn.smc_label = Some(label);
                }
            }
            f.smc_locations.insert(label, defs[0]);
            debug!("SMC label `{label}` assigned to r{} in `{}` ({} reads, {} writes)", reg.0, f.name, reads[&reg], defs.len());
        }

        f.is_smc_enabled = true;
        f.recompute_register_sets();
        true
    }
}

impl Pass for Smc {
    fn name(&self) -> &'static str {
        "smc"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let mut changed = false;
        for f in module.functions_mut() {
            changed |= self.run_function(f);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Function, Instruction, Param};

    fn reg(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn frequently_read_constant_becomes_smc() {
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 2;
        f.is_smc_enabled = true;
        f.instructions = vec![
            Instruction::load_const(reg(1), 5),
            Instruction::binop(Opcode::Add, reg(1), reg(1), reg(1)),
            Instruction::binop(Opcode::Add, reg(1), reg(1), reg(1)),
            Instruction::ret(reg(1)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = Smc::new(&PipelineConfig::default()).run(&mut module).unwrap();
        assert!(changed);
        let f = module.function(intern("f")).unwrap();
        assert_eq!(f.instructions[0].opcode, Opcode::SMCLoadConst);
        assert!(f.instructions[0].smc_label.is_some());
    }

    #[test]
    fn recursive_function_is_skipped() {
        let mut f = Function::new(intern("r"), vec![Param::new(intern("n"), intern("u8"))]);
        f.next_register = 2;
        f.is_smc_enabled = true;
        f.is_recursive = true;
        f.instructions = vec![
            Instruction::load_const(reg(1), 5),
            Instruction::binop(Opcode::Add, reg(1), reg(1), reg(1)),
            Instruction::ret(reg(1)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = Smc::new(&PipelineConfig::default()).run(&mut module).unwrap();
        assert!(!changed);
    }
}
