//! The [`Function`] record (§3).

use crate::common::{Id, Map, Reg, Set};
use crate::ir::instr::Instruction;

/// A calling convention tag. The closed set here is deliberately small: the
/// core only needs to distinguish the default register-passing convention
/// from TRUE-SMC's anchor-patched convention and the interrupt prologue the
/// excluded codegen wires in for `IsInterrupt` functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CallingConvention {
    #[default]
    Register,
    TrueSMC,
    Interrupt,
}

/// A formal parameter.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: Id,
    pub ty: Id,
    /// Set once the TRUE-SMC pass (§4.7) has bound this parameter to an
    /// anchor.
    pub is_tsmc_ref: bool,
}

impl Param {
    pub fn new(name: Id, ty: Id) -> Self {
        Param {
            name,
            ty,
            is_tsmc_ref: false,
        }
    }
}

/// A local variable slot, distinct from a register: locals are named and
/// addressed by `LoadVar`/`StoreVar`, registers are anonymous SSA-ish
/// temporaries addressed by `Move`/arithmetic.
#[derive(Clone, Debug)]
pub struct Local {
    pub name: Id,
    pub ty: Id,
}

/// One MIR function: a flat instruction vector plus the metadata flags
/// every pass consults or sets (§3).
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Id,
    pub params: Vec<Param>,
    pub locals: Map<Id, Local>,
    pub instructions: Vec<Instruction>,

    pub is_recursive: bool,
    pub has_tail_recursion: bool,
    pub is_smc_enabled: bool,
    pub is_interrupt: bool,
    pub uses_true_smc: bool,
    pub calling_convention: CallingConvention,

    pub num_params: usize,
    /// Smallest register id guaranteed to be free; always greater than any
    /// register mentioned anywhere in the function (§3 invariant).
    pub next_register: u32,
    pub used_registers: Set<Reg>,
    pub modified_registers: Set<Reg>,
    pub callee_saved_regs: Set<Reg>,
    pub max_stack_depth: usize,
    /// SMC label -> instruction index, maintained by both the TRUE-SMC
    /// (§4.7) and non-anchor SMC (§4.8) passes.
    pub smc_locations: Map<Id, usize>,

    pub attrs: Map<String, String>,
}

impl Function {
    pub fn new(name: Id, params: Vec<Param>) -> Self {
        let num_params = params.len();
        // Registers 1..=NumParams are reserved for formal parameters (§3);
        // register 0 is the sentinel, so the first free register is
        // NumParams + 1.
        let next_register = num_params as u32 + 1;
        Function {
            name,
            params,
            locals: Map::new(),
            instructions: Vec::new(),
            is_recursive: false,
            has_tail_recursion: false,
            is_smc_enabled: false,
            is_interrupt: false,
            uses_true_smc: false,
            calling_convention: CallingConvention::default(),
            num_params,
            next_register,
            used_registers: Set::new(),
            modified_registers: Set::new(),
            callee_saved_regs: Set::new(),
            max_stack_depth: 0,
            smc_locations: Map::new(),
            attrs: Map::new(),
        }
    }

    /// Allocate and return a fresh register, bumping `next_register`.
    pub fn fresh_register(&mut self) -> Reg {
        let r = Reg(self.next_register);
        self.next_register += 1;
        r
    }

    /// Recompute `used_registers`/`modified_registers` from the current
    /// instruction vector. Passes that rewrite registers should call this
    /// before relying on either set; it is cheap relative to a full pass
    /// sweep and keeps the two in sync without threading updates through
    /// every mutation site.
    pub fn recompute_register_sets(&mut self) {
        self.used_registers.clear();
        self.modified_registers.clear();
        for insn in &self.instructions {
            for r in insn.reads() {
                self.used_registers.insert(r);
            }
            if let Some(w) = insn.writes() {
                self.used_registers.insert(w);
                self.modified_registers.insert(w);
            }
        }
    }

    /// Index of the `Label` instruction with the given name, if any (§3
    /// invariant: at most one per function).
    pub fn label_index(&self, label: Id) -> Option<usize> {
        self.instructions.iter().position(|insn| {
            insn.opcode == crate::ir::opcode::Opcode::Label && insn.label == Some(label)
        })
    }

    /// `true` if `name` is inlinable per §4.5's non-size/non-recursion
    /// predicates (main/interrupt exclusion only; callers still must check
    /// size and recursion against the module's call graph).
    pub fn is_inline_eligible_shape(&self) -> bool {
        !self.is_interrupt && self.attrs.get("entry").map(|v| v != "true").unwrap_or(true)
    }
}
