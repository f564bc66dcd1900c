//! C1 — the IR model: instructions, functions, modules, registers, opcodes,
//! and the module-level patch table (§3).

pub mod function;
pub mod instr;
pub mod module;
pub mod opcode;
pub mod patch_table;

pub use function::{CallingConvention, Function, Local, Param};
pub use instr::{Instruction, PhysReg, ProfileHint};
pub use module::Module;
pub use opcode::Opcode;
pub use patch_table::{PatchEntry, PatchTable};

use crate::common::Id;
use crate::error::{CoreError, CoreResult};

/// Validate the §3 invariants that hold after every pass. Passes call this
/// in their own tests and the multi-level driver calls it between rounds
/// when `debug_assertions` are enabled; it is not run in release builds of
/// the driver itself to avoid paying O(n) validation on every iteration of
/// a hot fixed-point loop.
pub fn validate_function(module: &Module, f: &Function) -> CoreResult<()> {
    for (index, insn) in f.instructions.iter().enumerate() {
        match insn.opcode {
            Opcode::Jump | Opcode::JumpIf | Opcode::JumpIfNot => {
                let label = insn.label.ok_or_else(|| CoreError::Structural {
                    function: f.name,
                    index,
                    reason: "jump without a target label".into(),
                })?;
                if f.label_index(label).is_none() {
                    return Err(CoreError::Structural {
                        function: f.name,
                        index,
                        reason: format!("jump target `{label}` has no Label in this function"),
                    });
                }
            }
            Opcode::Call => {
                let callee = insn.symbol.ok_or_else(|| CoreError::Structural {
                    function: f.name,
                    index,
                    reason: "call without a symbol".into(),
                })?;
                if !module.is_declared(callee) {
                    return Err(CoreError::Structural {
                        function: f.name,
                        index,
                        reason: format!("call to undeclared symbol `{callee}`"),
                    });
                }
            }
            _ => {}
        }
        if let Some(w) = insn.writes() {
            if w.0 >= f.next_register {
                return Err(CoreError::Structural {
                    function: f.name,
                    index,
                    reason: format!(
                        "write to {w} but next_register is only {}",
                        f.next_register
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Validate every function in the module.
pub fn validate_module(module: &Module) -> CoreResult<()> {
    for f in module.functions() {
        validate_function(module, f)?;
    }
    Ok(())
}

/// Count how many `Call` instructions in `f` target `callee` — used by the
/// inliner's post-condition test (§8: "strictly fewer Call instructions to
/// that callee").
pub fn count_calls_to(f: &Function, callee: Id) -> usize {
    f.instructions
        .iter()
        .filter(|i| i.opcode == Opcode::Call && i.symbol == Some(callee))
        .count()
}
