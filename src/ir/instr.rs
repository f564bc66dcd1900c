//! The [`Instruction`] record (§3).

use crate::common::{Id, Map, Reg};
use crate::ir::opcode::Opcode;

/// A profile hint attached by the PGO layout pass (§4.13).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileHint {
    Hot,
    Warm,
    Cold,
}

impl std::fmt::Display for ProfileHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProfileHint::Hot => "hot",
            ProfileHint::Warm => "warm",
            ProfileHint::Cold => "cold",
        };
        write!(f, "{s}")
    }
}

/// A physical Z80 register, attached as side metadata by register
/// allocation (§4.12) rather than mutating the logical register id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum PhysReg {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    BC,
    DE,
    HL,
}

impl std::fmt::Display for PhysReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PhysReg::A => "A",
            PhysReg::B => "B",
            PhysReg::C => "C",
            PhysReg::D => "D",
            PhysReg::E => "E",
            PhysReg::H => "H",
            PhysReg::L => "L",
            PhysReg::BC => "BC",
            PhysReg::DE => "DE",
            PhysReg::HL => "HL",
        };
        write!(f, "{s}")
    }
}

/// A single MIR instruction. Every field beyond `opcode` and `dest` is
/// optional; most opcodes use only a handful of them (e.g. `Label` uses
/// only `label`, `LoadConst` uses `dest` and `imm`).
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Destination register. `Reg::NONE` means "no write".
    pub dest: Reg,
    /// Up to two source registers; unused slots are `Reg::NONE`.
    pub src1: Reg,
    pub src2: Reg,
    /// An immediate integer operand (constants, shift/inc/dec amounts).
    pub imm: i64,
    /// A symbolic target: callee name for `Call`, anchor symbol for
    /// `TrueSMCLoad`/`TSMCRefLoad`, SMC label for `SMCLoadConst`/`SMCStoreConst`.
    pub symbol: Option<Id>,
    /// Jump/branch target label, for `Jump`/`JumpIf`/`JumpIfNot`, and the
    /// label's own name for `Label`.
    pub label: Option<Id>,
    /// A type tag; left as a free-form string since the type system itself
    /// lives in the excluded semantic analyzer.
    pub ty: Option<Id>,
    pub comment: Option<String>,
    pub phys_dest: Option<PhysReg>,
    pub phys_src1: Option<PhysReg>,
    pub phys_src2: Option<PhysReg>,
    /// An SMC label distinct from `symbol`, used by the non-anchor SMC pass
    /// (§4.8) to name the patched immediate independently of TRUE-SMC's
    /// anchor symbols.
    pub smc_label: Option<Id>,
    pub profile_hint: Option<ProfileHint>,
    /// Opaque metadata keyed by string, used by passes to annotate
    /// instructions without widening this struct further (e.g. the
    /// diagnostic collector's pattern-match provenance).
    pub metadata: Map<String, String>,
}

impl Instruction {
    /// Build the minimal instruction for an opcode; callers fill in the
    /// fields they need via the `with_*` builders below.
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            dest: Reg::NONE,
            src1: Reg::NONE,
            src2: Reg::NONE,
            imm: 0,
            symbol: None,
            label: None,
            ty: None,
            comment: None,
            phys_dest: None,
            phys_src1: None,
            phys_src2: None,
            smc_label: None,
            profile_hint: None,
            metadata: Map::new(),
        }
    }

    pub fn with_dest(mut self, r: Reg) -> Self {
        self.dest = r;
        self
    }

    pub fn with_src1(mut self, r: Reg) -> Self {
        self.src1 = r;
        self
    }

    pub fn with_src2(mut self, r: Reg) -> Self {
        self.src2 = r;
        self
    }

    pub fn with_imm(mut self, imm: i64) -> Self {
        self.imm = imm;
        self
    }

    pub fn with_symbol(mut self, sym: Id) -> Self {
        self.symbol = Some(sym);
        self
    }

    pub fn with_label(mut self, label: Id) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    // --- Convenience constructors mirroring the common shapes in §8's
    // worked examples. ---

    pub fn load_const(dest: Reg, imm: i64) -> Self {
        Instruction::new(Opcode::LoadConst).with_dest(dest).with_imm(imm)
    }

    pub fn binop(op: Opcode, dest: Reg, lhs: Reg, rhs: Reg) -> Self {
        debug_assert!(op.is_binary_foldable() || matches!(op, Opcode::Cmp | Opcode::Test));
        Instruction::new(op).with_dest(dest).with_src1(lhs).with_src2(rhs)
    }

    pub fn mov(dest: Reg, src: Reg) -> Self {
        Instruction::new(Opcode::Move).with_dest(dest).with_src1(src)
    }

    pub fn label_def(name: Id) -> Self {
        Instruction::new(Opcode::Label).with_label(name)
    }

    pub fn jump(target: Id) -> Self {
        Instruction::new(Opcode::Jump).with_label(target)
    }

    pub fn jump_if_not(cond: Reg, target: Id) -> Self {
        Instruction::new(Opcode::JumpIfNot).with_src1(cond).with_label(target)
    }

    pub fn call(dest: Reg, callee: Id, a: Reg, b: Reg) -> Self {
        Instruction::new(Opcode::Call)
            .with_dest(dest)
            .with_symbol(callee)
            .with_src1(a)
            .with_src2(b)
    }

    pub fn ret(src: Reg) -> Self {
        Instruction::new(Opcode::Return).with_src1(src)
    }

    /// Registers this instruction reads from (excludes `dest`).
    pub fn reads(&self) -> Vec<Reg> {
        let mut out = Vec::new();
        if !self.src1.is_none() {
            out.push(self.src1);
        }
        if !self.src2.is_none() {
            out.push(self.src2);
        }
        // Store-family opcodes read their nominal "dest" as a value source,
        // not a write target (the destination here is the address/symbol).
        if matches!(
            self.opcode,
            Opcode::StoreVar | Opcode::StoreField | Opcode::StoreElement | Opcode::Store
        ) && !self.dest.is_none()
        {
            out.push(self.dest);
        }
        out
    }

    /// Register this instruction writes, if any.
    pub fn writes(&self) -> Option<Reg> {
        if self.opcode.is_void() || self.dest.is_none() {
            None
        } else {
            Some(self.dest)
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.dest.is_none() {
            write!(f, " {}", self.dest)?;
        }
        if !self.src1.is_none() {
            write!(f, ", {}", self.src1)?;
        }
        if !self.src2.is_none() {
            write!(f, ", {}", self.src2)?;
        }
        if self.opcode == Opcode::LoadConst || self.imm != 0 {
            write!(f, ", #{}", self.imm)?;
        }
        if let Some(sym) = self.symbol {
            write!(f, " {sym}")?;
        }
        if let Some(label) = self.label {
            write!(f, " {label}")?;
        }
        if let Some(c) = &self.comment {
            write!(f, " ; {c}")?;
        }
        Ok(())
    }
}
