/*!
cycles.rs - T-state timing table for the Z80 cost model.

Purpose
=======
Provides `base_cycles(mnemonic, operands)`, the canonical T-state count
used by the region scheduler's list-scheduling priority (§4.11) and by
diagnostics that want to report a cycle delta for a peephole match.

Scope
=====
Conditional instructions (`JR cc`, `JP cc`, `CALL cc`, `RET cc`) report the
worst-case (taken) cycle count unless the caller already knows the branch
outcome; the region scheduler does not attempt static branch prediction.
Indexed addressing (`(IX+d)`, `(IY+d)`) is not modeled distinctly from
`(HL)` pending real codegen — the instruction set exercised by this core's
passes never emits it.
*/

use crate::asm::token::{Line, Operand};

/// Look up the canonical T-state count for a tokenized instruction line.
/// Unrecognized mnemonics fall back to 4, the cheapest real Z80
/// instruction, rather than panicking on input the peephole/scheduler
/// didn't itself produce.
pub fn base_cycles(line: &Line) -> u32 {
    let Some(mnemonic) = line.mnemonic else {
        return 0;
    };
    let mnemonic = mnemonic.to_uppercase();
    let indirect = line.operands.iter().any(is_indirect_hl);

    match mnemonic.as_str() {
        "LD" => ld_cycles(line),
        "PUSH" => 11,
        "POP" => 10,
        "ADD" | "ADC" | "SUB" | "SBC" | "AND" | "OR" | "XOR" | "CP" => {
            if indirect {
                7
            } else if is_16bit_pair_op(line) {
                11
            } else {
                4
            }
        }
        "INC" | "DEC" => {
            if indirect {
                11
            } else if is_16bit_register(line.operands.first()) {
                6
            } else {
                4
            }
        }
        "JR" => {
            if line.operands.len() > 1 {
                12 // conditional, taken
            } else {
                12
            }
        }
        "JP" => {
            if is_indirect_hl_jump(line) {
                4
            } else {
                10
            }
        }
        "CALL" => 17,
        "RET" => {
            if line.operands.is_empty() {
                10
            } else {
                11 // conditional, taken
            }
        }
        "EX" => 4,
        "EXX" => 4,
        "NOP" => 4,
        "HALT" => 4,
        "DI" | "EI" => 4,
        "SCF" | "CCF" => 4,
        "NEG" => 8,
        "RLA" | "RLCA" | "RRA" | "RRCA" => 4,
        "DJNZ" => 13, // taken
        _ => 4,
    }
}

fn ld_cycles(line: &Line) -> u32 {
    let dst = line.operands.first();
    let src = line.operands.get(1);
    match (dst, src) {
        (Some(Operand::Reg(r)), Some(Operand::Imm(_))) if is_16bit_name(r.as_str()) => 10,
        (Some(_), Some(Operand::Imm(_))) => 7,
        (Some(d), Some(s)) if is_indirect(d) || is_indirect(s) => 7,
        (Some(Operand::Reg(_)), Some(Operand::Reg(_))) => 4,
        _ => 7,
    }
}

fn is_indirect(op: &Operand) -> bool {
    matches!(op, Operand::Reg(r) if r.starts_with('('))
}

fn is_indirect_hl(op: &Operand) -> bool {
    matches!(op, Operand::Reg(r) if r.as_str() == "(HL)")
}

fn is_indirect_hl_jump(line: &Line) -> bool {
    matches!(line.operands.first(), Some(Operand::Reg(r)) if r.as_str() == "(HL)")
}

fn is_16bit_name(name: &str) -> bool {
    matches!(name, "BC" | "DE" | "HL" | "SP" | "IX" | "IY" | "AF")
}

fn is_16bit_register(op: Option<&Operand>) -> bool {
    matches!(op, Some(Operand::Reg(r)) if is_16bit_name(r.as_str()))
}

fn is_16bit_pair_op(line: &Line) -> bool {
    matches!(line.operands.first(), Some(Operand::Reg(r)) if r.as_str() == "HL")
        && matches!(line.operands.get(1), Some(Operand::Reg(r)) if is_16bit_name(r.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::token::tokenize_line;

    #[test]
    fn ld_immediate_8bit_is_7_cycles() {
        assert_eq!(base_cycles(&tokenize_line("LD A,5")), 7);
    }

    #[test]
    fn ld_reg_reg_is_4_cycles() {
        assert_eq!(base_cycles(&tokenize_line("LD A,B")), 4);
    }

    #[test]
    fn call_is_17_cycles() {
        assert_eq!(base_cycles(&tokenize_line("CALL foo")), 17);
    }

    #[test]
    fn inc_indirect_hl_is_11_cycles() {
        assert_eq!(base_cycles(&tokenize_line("INC (HL)")), 11);
    }
}
