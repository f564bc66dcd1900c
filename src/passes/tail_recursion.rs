//! Tail-recursion elimination (§4.9).

use log::debug;

use crate::common::intern;
use crate::error::CoreResult;
use crate::ir::{Function, Instruction, Module, Opcode};
use crate::pass::Pass;

#[derive(Default)]
pub struct TailRecursion;

impl TailRecursion {
    pub fn new() -> Self {
        TailRecursion
    }

    fn loop_label(f: &Function) -> crate::common::Id {
        intern(format!("{}_start", f.name))
    }

    /// Insert `Label <fn>_start` right after the function's leading
    /// `LoadParam`/`SMCParam` instructions, if it isn't there already.
    /// Returns the index the label was inserted at, so callers holding
    /// indices computed before this call can shift them accordingly; `None`
    /// if the label was already present and nothing moved.
    fn ensure_loop_label(f: &mut Function, label: crate::common::Id) -> Option<usize> {
        if f.instructions.iter().any(|i| i.opcode == Opcode::Label && i.label == Some(label)) {
            return None;
        }
        let insert_at = f
            .instructions
            .iter()
            .position(|i| !matches!(i.opcode, Opcode::LoadParam | Opcode::SMCParam))
            .unwrap_or(f.instructions.len());
        f.instructions.insert(insert_at, Instruction::label_def(label));
        Some(insert_at)
    }

    fn run_function(&self, f: &mut Function) -> bool {
        let mut rewrites = Vec::new();
        let mut i = 0;
        while i + 1 < f.instructions.len() {
            let call = &f.instructions[i];
            let ret = &f.instructions[i + 1];
            if call.opcode == Opcode::Call
                && call.symbol == Some(f.name)
                && ret.opcode == Opcode::Return
                && ret.src1 == call.dest
            {
                rewrites.push(i);
            }
            i += 1;
        }
        if rewrites.is_empty() {
            return false;
        }

        let label = Self::loop_label(f);
        let inserted_at = Self::ensure_loop_label(f, label);

        for &call_index in rewrites.iter().rev() {
            let call_index = match inserted_at {
                Some(pos) if call_index >= pos => call_index + 1,
                _ => call_index,
            };
            debug!("tail call in `{}` at instruction {call_index} -> jump {label}", f.name);
            let call = f.instructions[call_index].clone();
            f.instructions.splice(
                call_index..=call_index + 1,
                vec![Instruction::jump(label)
                    .with_comment(format!("tail call eliminated (args via r{}/r{})", call.src1.0, call.src2.0))],
            );
        }
        f.has_tail_recursion = true;
        f.recompute_register_sets();
        true
    }
}

impl Pass for TailRecursion {
    fn name(&self) -> &'static str {
        "tail-recursion"
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
    use crate::common::Reg;
    use crate::ir::{Function, Opcode};

    fn reg(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn direct_tail_call_becomes_a_jump() {
        let mut f = Function::new(intern("fact"), vec![crate::ir::Param::new(intern("n"), intern("u8"))]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::new(Opcode::LoadParam).with_dest(reg(1)).with_imm(0),
            Instruction::call(reg(2), intern("fact"), reg(1), Reg::NONE),
            Instruction::ret(reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = TailRecursion::new().run(&mut module).unwrap();
        assert!(changed);

        let f = module.function(intern("fact")).unwrap();
        assert!(f.has_tail_recursion);
        assert!(f.instructions.iter().any(|i| i.opcode == Opcode::Label));
        assert!(f.instructions.iter().any(|i| i.opcode == Opcode::Jump));
        assert!(!f.instructions.iter().any(|i| i.opcode == Opcode::Call));
    }

    #[test]
    fn non_tail_call_is_left_alone() {
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::call(reg(1), intern("f"), Reg::NONE, Reg::NONE),
            Instruction::binop(Opcode::Add, reg(2), reg(1), reg(1)),
            Instruction::ret(reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = TailRecursion::new().run(&mut module).unwrap();
        assert!(!changed);
    }
}
