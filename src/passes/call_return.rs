//! Call-return optimization.
//!
//! The component table names this pass but the body text only elaborates
//! the self-recursive case ([`crate::passes::tail_recursion`]). Generalized
//! here to any callee: a `Call` immediately followed by `Return` of the
//! call's own destination is a sibling call, and the actual register
//! restoring/stack teardown a `CALL`+`RET` pair performs is redundant with
//! what the jump target's own `RET` will do. MIR cannot rewrite this to a
//! `Jump` itself — the target lives in a different function and the excluded
//! codegen stage owns frame layout — so this pass only annotates the `Call`
//! with a `tail_call` metadata flag for codegen to act on.

use crate::error::CoreResult;
use crate::ir::{Function, Module, Opcode};
use crate::pass::Pass;

#[derive(Default)]
pub struct CallReturn;

impl CallReturn {
    pub fn new() -> Self {
        CallReturn
    }

    fn run_function(&self, f: &mut Function) -> bool {
        let mut changed = false;
        for i in 0..f.instructions.len().saturating_sub(1) {
            let is_call = f.instructions[i].opcode == Opcode::Call;
            let already_tagged = f.instructions[i].metadata.get("tail_call").is_some();
            if !is_call || already_tagged {
                continue;
            }
            let call_dest = f.instructions[i].dest;
            let next = &f.instructions[i + 1];
            if next.opcode == Opcode::Return && next.src1 == call_dest {
                f.instructions[i].metadata.insert("tail_call".to_string(), "true".to_string());
                changed = true;
            }
        }
        changed
    }
}

impl Pass for CallReturn {
    fn name(&self) -> &'static str {
        "call-return"
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
    use crate::common::{intern, Reg};
    use crate::ir::Instruction;

    #[test]
    fn call_followed_by_matching_return_is_tagged() {
        let mut f = Function::new(intern("caller"), vec![]);
        f.next_register = 2;
        f.instructions = vec![
            Instruction::call(Reg(1), intern("other"), Reg::NONE, Reg::NONE),
            Instruction::ret(Reg(1)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = CallReturn::new().run(&mut module).unwrap();
        assert!(changed);
        let f = module.function(intern("caller")).unwrap();
        assert_eq!(f.instructions[0].metadata.get("tail_call").map(String::as_str), Some("true"));
    }

    #[test]
    fn call_whose_result_is_reused_is_not_tagged() {
        let mut f = Function::new(intern("caller"), vec![]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::call(Reg(1), intern("other"), Reg::NONE, Reg::NONE),
            Instruction::binop(Opcode::Add, Reg(2), Reg(1), Reg(1)),
            Instruction::ret(Reg(2)),
        ];
        let mut module = Module::new();
        module.add_function(f);

        let changed = CallReturn::new().run(&mut module).unwrap();
        assert!(!changed);
    }
}
