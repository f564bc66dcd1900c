//! The closed opcode variant set (§3). Adding a variant here touches every
//! pass in [`crate::passes`] and [`crate::asm`], so the enum is kept
//! deliberately flat rather than split by sub-trait.

use derive_more::Display;

/// A MIR opcode. The set is closed: arithmetic, logical, data movement,
/// control, comparison, SMC, and a single `Comment` escape hatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Opcode {
    // Arithmetic
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("mod")]
    Mod,
    #[display("neg")]
    Neg,

    // Logical
    #[display("and")]
    And,
    #[display("or")]
    Or,
    #[display("xor")]
    Xor,
    #[display("not")]
    Not,
    #[display("shl")]
    Shl,
    #[display("shr")]
    Shr,

    // Data movement
    #[display("load_const")]
    LoadConst,
    #[display("move")]
    Move,
    #[display("load_var")]
    LoadVar,
    #[display("store_var")]
    StoreVar,
    #[display("load_param")]
    LoadParam,
    #[display("load_field")]
    LoadField,
    #[display("store_field")]
    StoreField,
    #[display("load_element")]
    LoadElement,
    #[display("store_element")]
    StoreElement,
    #[display("load")]
    Load,
    #[display("store")]
    Store,

    // Control
    #[display("jump")]
    Jump,
    #[display("jump_if")]
    JumpIf,
    #[display("jump_if_not")]
    JumpIfNot,
    #[display("label")]
    Label,
    #[display("call")]
    Call,
    #[display("return")]
    Return,
    #[display("nop")]
    Nop,

    // Comparison
    #[display("eq")]
    Eq,
    #[display("ne")]
    Ne,
    #[display("lt")]
    Lt,
    #[display("gt")]
    Gt,
    #[display("le")]
    Le,
    #[display("ge")]
    Ge,
    #[display("cmp")]
    Cmp,
    #[display("test")]
    Test,
    #[display("inc")]
    Inc,
    #[display("dec")]
    Dec,

    // SMC
    #[display("smc_load_const")]
    SMCLoadConst,
    #[display("smc_store_const")]
    SMCStoreConst,
    #[display("smc_param")]
    SMCParam,
    #[display("true_smc_load")]
    TrueSMCLoad,
    #[display("store_tsmc_ref")]
    StoreTSMCRef,
    #[display("tsmc_ref_load")]
    TSMCRefLoad,
    #[display("tsmc_ref_patch")]
    TSMCRefPatch,

    // Misc
    #[display("comment")]
    Comment,
}

impl Opcode {
    /// Binary arithmetic/logical/shift opcodes foldable by [`crate::passes::const_fold`]
    /// when both sources are constants.
    pub fn is_binary_foldable(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Add | Sub | Mul | Div | Mod | And | Or | Xor | Shl | Shr | Eq | Ne | Lt | Gt | Le | Ge
        )
    }

    /// Unary opcodes foldable on a single constant source.
    pub fn is_unary_foldable(self) -> bool {
        matches!(self, Opcode::Neg | Opcode::Not)
    }

    /// Control-flow opcodes; a pass region boundary in the scheduler (§4.6)
    /// and the ASM partitioner (§4.11).
    pub fn is_control_flow(self) -> bool {
        use Opcode::*;
        matches!(self, Jump | JumpIf | JumpIfNot | Label | Call | Return)
    }

    /// Memory operations; treated as conservative scheduling fences (§4.6).
    pub fn is_memory(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            LoadVar
                | StoreVar
                | LoadField
                | StoreField
                | LoadElement
                | StoreElement
                | Load
                | Store
        )
    }

    /// `true` for opcodes that never write a destination register.
    pub fn is_void(self) -> bool {
        use Opcode::*;
        matches!(self, Jump | Label | Return | Nop | Comment | StoreVar | StoreField | StoreElement | Store)
    }
}
