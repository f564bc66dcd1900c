//! A thin textual Z80 codegen bridge.
//!
//! This is deliberately not a faithful final assembler: the real codegen
//! that turns a [`Module`] into shippable Z80 is a peer subsystem this core
//! treats as an external contract. This module exists only to give
//! [`crate::asm`] and the `mirc` binary a text buffer to operate on when
//! driving the pipeline end to end — every MIR register lowers to either
//! its allocated [`PhysReg`] (if [`crate::passes::RegAlloc`] ran) or a
//! placeholder virtual-register name.
//!
//! Emitted lines follow the assembly boundary grammar (§6): uppercase
//! mnemonics, `#` for immediates, `(sym)` for absolute memory.

use crate::common::Reg;
use crate::ir::function::Function;
use crate::ir::instr::Instruction;
use crate::ir::module::Module;
use crate::ir::opcode::Opcode;

fn reg_name(r: Reg, phys: Option<crate::ir::instr::PhysReg>) -> String {
    match phys {
        Some(p) => p.to_string(),
        None => r.to_string(),
    }
}

fn operand(insn: &Instruction, which: Which) -> String {
    let (reg, phys) = match which {
        Which::Dest => (insn.dest, insn.phys_dest),
        Which::Src1 => (insn.src1, insn.phys_src1),
        Which::Src2 => (insn.src2, insn.phys_src2),
    };
    reg_name(reg, phys)
}

enum Which {
    Dest,
    Src1,
    Src2,
}

fn emit_instruction(out: &mut String, insn: &Instruction) {
    use Opcode::*;
    let dest = operand(insn, Which::Dest);
    let src1 = operand(insn, Which::Src1);
    let src2 = operand(insn, Which::Src2);

    match insn.opcode {
        Label => {
            let name = insn.label.expect("Label instruction always carries a name");
            out.push_str(&format!("{name}:\n"));
            return;
        }
        Comment => {
            if let Some(c) = &insn.comment {
                out.push_str(&format!("; {c}\n"));
            }
            return;
        }
        _ => {}
    }

    let mut line = match insn.opcode {
        LoadConst => format!("LD {dest},#{}", insn.imm),
        Move => format!("LD {dest},{src1}"),
        LoadVar | LoadField | LoadElement | Load => {
            format!("LD {dest},({})", insn.symbol.map(|s| s.to_string()).unwrap_or(src1))
        }
        StoreVar | StoreField | StoreElement | Store => {
            format!("LD ({}),{dest}", insn.symbol.map(|s| s.to_string()).unwrap_or_default())
        }
        LoadParam => format!("LD {dest},{src1}"),
        Add => format!("ADD {dest},{src2}"),
        Sub => format!("SUB {dest},{src2}"),
        Mul => format!("CALL __mul16 ; {dest} = {src1} * {src2}"),
        Div => format!("CALL __div16 ; {dest} = {src1} / {src2}"),
        Mod => format!("CALL __mod16 ; {dest} = {src1} % {src2}"),
        Neg => format!("NEG ; {dest} = -{src1}"),
        And => format!("AND {src2} ; {dest}"),
        Or => format!("OR {src2} ; {dest}"),
        Xor => format!("XOR {src2} ; {dest}"),
        Not => format!("CPL ; {dest} = !{src1}"),
        Shl => format!("SLA {dest}"),
        Shr => format!("SRL {dest}"),
        Jump => format!("JP {}", insn.label.expect("Jump always carries a target")),
        JumpIf => format!("JP NZ,{}", insn.label.expect("JumpIf always carries a target")),
        JumpIfNot => format!("JP Z,{}", insn.label.expect("JumpIfNot always carries a target")),
        Call => {
            let callee = insn.symbol.expect("Call always carries a callee symbol");
            format!("CALL {callee} ; args=({src1},{src2}) -> {dest}")
        }
        Return => format!("RET ; {src1}"),
        Nop => "NOP".to_string(),
        Eq | Ne | Lt | Gt | Le | Ge | Cmp | Test => format!("CP {src2} ; {dest} = {src1} ? {src2}"),
        Inc => format!("INC {dest}"),
        Dec => format!("DEC {dest}"),
        SMCLoadConst => format!(
            "LD {dest},#{} ; smc {}",
            insn.imm,
            insn.smc_label.map(|s| s.to_string()).unwrap_or_default()
        ),
        SMCStoreConst => format!(
            "LD ({}),{dest} ; smc store",
            insn.smc_label.map(|s| s.to_string()).unwrap_or_default()
        ),
        SMCParam => format!("LD {dest},{src1} ; smc param"),
        TrueSMCLoad => format!(
            "{}: LD {dest},#0 ; true-smc anchor",
            insn.symbol.map(|s| s.to_string()).unwrap_or_default()
        ),
        StoreTSMCRef => format!("LD ({}),{dest} ; tsmc ref", insn.symbol.map(|s| s.to_string()).unwrap_or_default()),
        TSMCRefLoad => format!("LD {dest},({})", insn.symbol.map(|s| s.to_string()).unwrap_or_default()),
        TSMCRefPatch => format!("LD ({}),{dest} ; tsmc patch", insn.symbol.map(|s| s.to_string()).unwrap_or_default()),
        Label | Comment => unreachable!("handled above"),
    };
    // A TRUE-SMC use site that hosts its anchor directly (§4.7) carries
    // `smc_label` on whatever opcode it already was; `SMCLoadConst`/
    // `SMCStoreConst` fold the label into their own format above, so only
    // tag it on here for every other opcode.
    if !matches!(insn.opcode, SMCLoadConst | SMCStoreConst) {
        if let Some(label) = insn.smc_label {
            line.push_str(&format!(" ; true-smc anchor {label}"));
        }
    }
    out.push_str(&line);
    out.push('\n');
}

/// Lower one function to its textual assembly body.
pub fn emit_function(f: &Function) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}:\n", f.name));
    for insn in &f.instructions {
        emit_instruction(&mut out, insn);
    }
    out
}

/// Lower a whole module to the assembly boundary text buffer (§6).
pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    for f in module.functions() {
        out.push_str(&emit_function(f));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::intern;
    use crate::ir::function::Function;

    #[test]
    fn a_load_const_lowers_to_an_ld_immediate_line() {
        let mut f = Function::new(intern("main"), vec![]);
        let dest = f.fresh_register();
        f.instructions.push(Instruction::load_const(dest, 42));
        let text = emit_function(&f);
        assert!(text.contains("#42"));
    }

    #[test]
    fn a_label_renders_as_a_bare_colon_line() {
        let mut f = Function::new(intern("main"), vec![]);
        f.instructions.push(Instruction::label_def(intern("loop_start")));
        let text = emit_function(&f);
        assert!(text.contains("loop_start:\n"));
    }

    #[test]
    fn a_direct_true_smc_host_carries_its_anchor_as_a_trailing_comment() {
        let mut f = Function::new(intern("main"), vec![]);
        let anchor = intern("n$imm0");
        let mut add = Instruction::binop(Opcode::Add, crate::common::Reg(1), crate::common::Reg(1), crate::common::Reg(2));
        add.smc_label = Some(anchor);
        f.instructions.push(add);
        let text = emit_function(&f);
        assert!(text.contains("true-smc anchor n$imm0"));
    }
}
