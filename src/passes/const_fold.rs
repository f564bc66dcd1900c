//! Constant folding (§4.2).

use log::warn;

use crate::common::{Map, Reg};
use crate::error::CoreResult;
use crate::ir::{Instruction, Module, Opcode};
use crate::pass::Pass;

/// Folds constant arithmetic/logical/shift/comparison chains and simplifies
/// `JumpIfNot` on a known condition. Maintains a register -> constant map
/// that is invalidated on any write the fold rules don't themselves
/// produce.
#[derive(Default)]
pub struct ConstFold;

impl ConstFold {
    pub fn new() -> Self {
        ConstFold
    }

    fn fold_function(&self, f: &mut crate::ir::Function) -> bool {
        let mut consts: Map<Reg, i64> = Map::new();
        let mut changed = false;
        let mut i = 0;
        while i < f.instructions.len() {
            let opcode = f.instructions[i].opcode;
            match opcode {
                Opcode::LoadConst => {
                    let dest = f.instructions[i].dest;
                    let imm = f.instructions[i].imm;
                    consts.insert(dest, imm);
                }
                op if op.is_binary_foldable() => {
                    let insn = f.instructions[i].clone();
                    if let (Some(&a), Some(&b)) = (consts.get(&insn.src1), consts.get(&insn.src2)) {
                        if let Some(folded) = eval_binop(op, a, b) {
                            f.instructions[i] = Instruction::load_const(insn.dest, folded)
                                .with_comment(format!("folded {op} {a}, {b}"));
                            consts.insert(insn.dest, folded);
                            changed = true;
                        } else {
                            // Division/modulus by zero: leave for runtime,
                            // but invalidate since we can't reason about it.
                            warn!(
                                "constant fold skipped division/modulus by zero in `{}` at instruction {i}",
                                f.name
                            );
                            consts.remove(&insn.dest);
                        }
                    } else {
                        consts.remove(&insn.dest);
                    }
                }
                op if op.is_unary_foldable() => {
                    let insn = f.instructions[i].clone();
                    if let Some(&a) = consts.get(&insn.src1) {
                        let folded = match op {
                            Opcode::Neg => -a,
                            Opcode::Not => !a,
                            _ => unreachable!(),
                        };
                        f.instructions[i] = Instruction::load_const(insn.dest, folded)
                            .with_comment(format!("folded {op} {a}"));
                        consts.insert(insn.dest, folded);
                        changed = true;
                    } else {
                        consts.remove(&insn.dest);
                    }
                }
                Opcode::JumpIfNot => {
                    let insn = f.instructions[i].clone();
                    if let Some(&cond) = consts.get(&insn.src1) {
                        if cond == 0 {
                            f.instructions[i] = Instruction::jump(insn.label.expect("jump target"))
                                .with_comment("folded: condition always zero");
                            changed = true;
                        } else {
                            f.instructions[i] = Instruction::new(Opcode::Comment)
                                .with_comment("folded out: condition never zero");
                            changed = true;
                        }
                    }
                }
                _ => {
                    if let Some(w) = f.instructions[i].writes() {
                        consts.remove(&w);
                    }
                }
            }
            i += 1;
        }
        changed
    }
}

/// Fold a binary arithmetic/logical/shift/comparison opcode over two known
/// constants. Returns `None` for division or modulus by zero, which the
/// caller leaves unfolded per §4.2 and §7 (`DivisionByZero`: "do not fold").
fn eval_binop(op: Opcode, a: i64, b: i64) -> Option<i64> {
    use Opcode::*;
    Some(match op {
        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Mul => a.wrapping_mul(b),
        Div => {
            if b == 0 {
                return None;
            }
            a.wrapping_div(b)
        }
        Mod => {
            if b == 0 {
                return None;
            }
            a.wrapping_rem(b)
        }
        And => a & b,
        Or => a | b,
        Xor => a ^ b,
        Shl => a.wrapping_shl(b as u32),
        Shr => a.wrapping_shr(b as u32),
        Eq => (a == b) as i64,
        Ne => (a != b) as i64,
        Lt => (a < b) as i64,
        Gt => (a > b) as i64,
        Le => (a <= b) as i64,
        Ge => (a >= b) as i64,
        _ => return None,
    })
}

impl Pass for ConstFold {
    fn name(&self) -> &'static str {
        "const-fold"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let mut changed = false;
        for f in module.functions_mut() {
            changed |= self.fold_function(f);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::intern;
    use crate::ir::Function;

    fn reg(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn folds_add_of_two_constants() {
        // §8 scenario 1: LoadConst r1,10; LoadConst r2,20; Add r3,r1,r2
        let mut f = Function::new(intern("main"), vec![]);
        f.next_register = 4;
        f.instructions = vec![
            Instruction::load_const(reg(1), 10),
            Instruction::load_const(reg(2), 20),
            Instruction::binop(Opcode::Add, reg(3), reg(1), reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let mut pass = ConstFold::new();
        let changed = pass.run(&mut module).unwrap();
        assert!(changed);

        let f = module.function(intern("main")).unwrap();
        assert_eq!(f.instructions[2].opcode, Opcode::LoadConst);
        assert_eq!(f.instructions[2].imm, 30);
        assert_eq!(f.instructions[2].dest, reg(3));
    }

    #[test]
    fn always_true_branch_becomes_jump() {
        // §8 scenario 2: LoadConst r1,0; JumpIfNot r1,else; LoadConst r2,42
        let mut f = Function::new(intern("main"), vec![]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::load_const(reg(1), 0),
            Instruction::jump_if_not(reg(1), intern("else")),
            Instruction::load_const(reg(2), 42),
        ];
        let mut module = Module::new();
        module.add_function(f);

        ConstFold::new().run(&mut module).unwrap();

        let f = module.function(intern("main")).unwrap();
        assert_eq!(f.instructions[1].opcode, Opcode::Jump);
        assert_eq!(f.instructions[1].label, Some(intern("else")));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        let mut f = Function::new(intern("main"), vec![]);
        f.next_register = 4;
        f.instructions = vec![
            Instruction::load_const(reg(1), 10),
            Instruction::load_const(reg(2), 0),
            Instruction::binop(Opcode::Div, reg(3), reg(1), reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        ConstFold::new().run(&mut module).unwrap();

        let f = module.function(intern("main")).unwrap();
        assert_eq!(f.instructions[2].opcode, Opcode::Div);
    }

    #[test]
    fn folding_is_idempotent() {
        let mut f = Function::new(intern("main"), vec![]);
        f.next_register = 4;
        f.instructions = vec![
            Instruction::load_const(reg(1), 10),
            Instruction::load_const(reg(2), 20),
            Instruction::binop(Opcode::Add, reg(3), reg(1), reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        ConstFold::new().run(&mut module).unwrap();
        let once = format!("{:?}", module.function(intern("main")).unwrap().instructions);
        ConstFold::new().run(&mut module).unwrap();
        let twice = format!("{:?}", module.function(intern("main")).unwrap().instructions);
        assert_eq!(once, twice);
    }
}
