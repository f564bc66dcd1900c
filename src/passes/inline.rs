//! Inlining (§4.5).
//!
//! A call site is inlined when the callee is non-`main`, non-interrupt,
//! below the configured size threshold, non-recursive in the module's call
//! graph, and loop-free. The instruction model carries at most two call
//! arguments (`src1`/`src2`, §3), so only `LoadParam 0`/`LoadParam 1` are
//! rewritten; a callee that reads a third parameter is left un-inlined
//! (treated as over budget) rather than silently miscompiled.

use log::debug;

use crate::analysis::{has_backward_jump, CallGraph};
use crate::common::{Id, Map, Reg};
use crate::config::PipelineConfig;
use crate::error::CoreResult;
use crate::ir::{Function, Instruction, Module, Opcode};
use crate::pass::Pass;

pub struct Inline {
    size_threshold: usize,
}

impl Inline {
    pub fn new(config: &PipelineConfig) -> Self {
        Inline {
            size_threshold: config.inline_size_threshold,
        }
    }

    /// §4.5's inlinability predicate, independent of any particular call
    /// site.
    fn is_inlinable(&self, callee: &Function, caller_name: Id, graph: &CallGraph) -> bool {
        if callee.name == caller_name {
            return false; // never inline a function into itself
        }
        if callee.is_interrupt {
            return false;
        }
        if callee.attrs.get("entry").map(|v| v == "true").unwrap_or(false) {
            return false; // "non-main"
        }
        if callee.instructions.len() >= self.size_threshold {
            return false;
        }
        if callee.is_recursive || graph.shortest_self_cycle(callee.name).is_some() {
            return false;
        }
        if has_backward_jump(callee) {
            return false;
        }
        true
    }

    /// Clone `callee`'s body into `caller` at the position of `call`,
    /// renaming registers and rewriting `LoadParam`/`Return` per §4.5.
    fn splice(&self, caller: &mut Function, call_index: usize, callee: &Function) {
        let call = caller.instructions[call_index].clone();
        let mut renames: Map<Reg, Reg> = Map::new();
        let args = [call.src1, call.src2];

        let mut rename = |r: Reg, caller: &mut Function, renames: &mut Map<Reg, Reg>| -> Reg {
            if r.is_none() {
                return r;
            }
            if let Some(&mapped) = renames.get(&r) {
                return mapped;
            }
            let fresh = caller.fresh_register();
            renames.insert(r, fresh);
            fresh
        };

        let mut label_renames: Map<Id, Id> = Map::new();
        let mut spliced = Vec::with_capacity(callee.instructions.len());

        for insn in &callee.instructions {
            if insn.opcode == Opcode::LoadParam {
                let idx = insn.imm as usize;
                if idx < args.len() && !args[idx].is_none() {
                    renames.insert(insn.dest, args[idx]);
                    continue; // dropped: caller's argument register is used directly
                }
            }
            let mut rewritten = insn.clone();
            if rewritten.opcode == Opcode::Return {
                spliced.push(
                    Instruction::mov(call.dest, rename(rewritten.src1, caller, &mut renames))
                        .with_comment(format!("inlined return from `{}`", callee.name)),
                );
                continue;
            }
            // Disambiguate the callee's labels from the caller's by
            // suffixing with the call site index, so a loop-free callee
            // inlined twice doesn't collide with itself.
            if let Some(label) = rewritten.label {
                if rewritten.opcode == Opcode::Label
                    || matches!(rewritten.opcode, Opcode::Jump | Opcode::JumpIf | Opcode::JumpIfNot)
                {
                    let renamed = *label_renames
                        .entry(label)
                        .or_insert_with(|| crate::common::intern(format!("{label}$inline{call_index}")));
                    rewritten.label = Some(renamed);
                }
            }
            rewritten.dest = rename(rewritten.dest, caller, &mut renames);
            rewritten.src1 = rename(rewritten.src1, caller, &mut renames);
            rewritten.src2 = rename(rewritten.src2, caller, &mut renames);
            spliced.push(rewritten);
        }

        caller.instructions.splice(call_index..=call_index, spliced);
    }
}

impl Pass for Inline {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let graph = CallGraph::build(module);
        let names: Vec<Id> = module.functions().map(|f| f.name).collect();
        let mut changed = false;

        for caller_name in names {
            loop {
                let candidate = {
                    let caller = module.function(caller_name).expect("caller exists");
                    caller.instructions.iter().enumerate().find_map(|(i, insn)| {
                        if insn.opcode != Opcode::Call {
                            return None;
                        }
                        let callee_name = insn.symbol?;
                        let callee = module.function(callee_name)?;
                        if self.is_inlinable(callee, caller_name, &graph) {
                            Some(i)
                        } else {
                            None
                        }
                    })
                };
                let Some(call_index) = candidate else { break };
                let callee_name = module.function(caller_name).unwrap().instructions[call_index]
                    .symbol
                    .unwrap();
                let callee = module.function(callee_name).unwrap().clone();
                let caller = module.function_mut(caller_name).unwrap();
                debug!("inlining `{callee_name}` into `{caller_name}` at instruction {call_index}");
                self.splice(caller, call_index, &callee);
                caller.recompute_register_sets();
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::intern;
    use crate::ir::{count_calls_to, Function, Param};

    fn reg(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn inlining_removes_the_call() {
        let mut callee = Function::new(intern("add_one"), vec![Param::new(intern("x"), intern("u8"))]);
        callee.next_register = 3;
        callee.instructions = vec![
            Instruction::new(Opcode::LoadParam).with_dest(reg(1)).with_imm(0),
            Instruction::load_const(reg(2), 1),
            Instruction::binop(Opcode::Add, reg(1), reg(1), reg(2)),
            Instruction::ret(reg(1)),
        ];

        let mut caller = Function::new(intern("main"), vec![]);
        caller.next_register = 3;
        caller.instructions = vec![
            Instruction::load_const(reg(1), 41),
            Instruction::call(reg(2), intern("add_one"), reg(1), Reg::NONE),
            Instruction::ret(reg(2)),
        ];
        caller.attrs.insert("entry".into(), "true".into());

        let mut module = Module::new();
        module.add_function(callee);
        module.add_function(caller);

        let config = PipelineConfig::default();
        let changed = Inline::new(&config).run(&mut module).unwrap();
        assert!(changed);

        let caller = module.function(intern("main")).unwrap();
        assert_eq!(count_calls_to(caller, intern("add_one")), 0);
    }
}
