//! MIR peephole (§4.4): a table of local rewrite patterns, applied
//! left-to-right with first-match-wins, re-swept to a fixed point capped at
//! 10 iterations.

use log::trace;

use crate::error::CoreResult;
use crate::ir::{Function, Instruction, Module, Opcode, PhysReg};
use crate::pass::Pass;

/// A window match: how many leading instructions (starting at the match
/// site) the pattern consumes, and what to replace them with.
type MatchResult = Option<(usize, Vec<Instruction>)>;

/// One peephole pattern: a name for diagnostics and a matcher closure.
/// Matchers are plain function pointers (no pattern here needs to capture
/// state beyond the window itself and the profitability oracle) so the
/// pattern table can be a `const`-friendly `Vec` built once per pass.
struct PeepholePattern {
    name: &'static str,
    matcher: fn(&[Instruction]) -> MatchResult,
}

/// Decide whether an INC/DEC rewrite of `count` (1..=3) is profitable for
/// the given physical register assignment (§4.4). Until register
/// allocation has run (`phys` is `None`), the oracle is conservative and
/// only accepts ±1..2 — this is re-evaluated (not cached) every time a
/// pattern fires, per the spec's mandate to recompute after allocation
/// rather than reuse a pre-allocation answer (§9, Open Question 1).
fn inc_dec_profitable(count: i64, phys: Option<PhysReg>) -> bool {
    let count = count.unsigned_abs();
    match phys {
        Some(PhysReg::A) => count == 1,
        Some(PhysReg::BC) | Some(PhysReg::DE) | Some(PhysReg::HL) => count >= 1 && count <= 2,
        Some(_) => count >= 1 && count <= 3, // other 8-bit registers: B, C, D, E, H, L
        None => count >= 1 && count <= 2,
    }
}

fn pat_load_zero_to_xor(w: &[Instruction]) -> MatchResult {
    let i = &w[0];
    if i.opcode == Opcode::LoadConst && i.imm == 0 {
        let rewritten = Instruction::new(Opcode::Xor)
            .with_dest(i.dest)
            .with_src1(i.dest)
            .with_src2(i.dest)
            .with_comment("peephole: load 0 -> xor r,r");
        return Some((1, vec![rewritten]));
    }
    None
}

fn pat_load_const_add_to_inc(w: &[Instruction]) -> MatchResult {
    if w.len() < 2 {
        return None;
    }
    let load = &w[0];
    let add = &w[1];
    if load.opcode != Opcode::LoadConst || !(1..=3).contains(&load.imm) {
        return None;
    }
    let is_add = add.opcode == Opcode::Add && add.dest == add.src1 && add.src2 == load.dest;
    let is_sub = add.opcode == Opcode::Sub && add.dest == add.src1 && add.src2 == load.dest;
    if !(is_add || is_sub) {
        return None;
    }
    if !inc_dec_profitable(load.imm, add.phys_dest) {
        return None;
    }
    let op = if is_add { Opcode::Inc } else { Opcode::Dec };
    let rewritten: Vec<Instruction> = (0..load.imm)
        .map(|_| {
            let mut insn = Instruction::new(op)
                .with_dest(add.dest)
                .with_src1(add.dest)
                .with_comment(format!("peephole: unrolled {op}"));
            insn.phys_dest = add.phys_dest;
            insn.phys_src1 = add.phys_dest;
            insn
        })
        .collect();
    Some((2, rewritten))
}

fn pat_load_pow2_mul_to_shift(w: &[Instruction]) -> MatchResult {
    if w.len() < 2 {
        return None;
    }
    let load = &w[0];
    let mul = &w[1];
    if load.opcode != Opcode::LoadConst || mul.opcode != Opcode::Mul {
        return None;
    }
    let k = load.imm;
    if k <= 0 || (k & (k - 1)) != 0 {
        return None; // not a power of two
    }
    let shift = k.trailing_zeros() as i64;
    // mul.src2 must be the loaded constant's register (order-insensitive).
    if mul.src2 != load.dest && mul.src1 != load.dest {
        return None;
    }
    let src = if mul.src2 == load.dest { mul.src1 } else { mul.src2 };
    let rewritten = Instruction::new(Opcode::Shl)
        .with_dest(mul.dest)
        .with_src1(src)
        .with_imm(shift)
        .with_comment(format!("peephole: mul by 2^{shift} -> shl"));
    Some((2, vec![rewritten]))
}

fn pat_jump_label_jump(w: &[Instruction]) -> MatchResult {
    if w.len() < 3 {
        return None;
    }
    let (j1, l1, j2) = (&w[0], &w[1], &w[2]);
    if j1.opcode == Opcode::Jump && l1.opcode == Opcode::Label && j1.label == l1.label {
        if j2.opcode == Opcode::Jump {
            return Some((
                1,
                vec![Instruction::jump(j2.label.expect("jump target")).with_comment("peephole: chained jump")],
            ));
        }
    }
    None
}

fn pat_duplicate_load_var(w: &[Instruction]) -> MatchResult {
    if w.len() < 2 {
        return None;
    }
    let (a, b) = (&w[0], &w[1]);
    if a.opcode == Opcode::LoadVar && b.opcode == Opcode::LoadVar && a.symbol == b.symbol && a.symbol.is_some() {
        let rewritten = vec![
            a.clone(),
            Instruction::mov(b.dest, a.dest).with_comment("peephole: reused prior load"),
        ];
        return Some((2, rewritten));
    }
    None
}

fn pat_drop_redundant_param_store(w: &[Instruction]) -> MatchResult {
    if w.len() < 2 {
        return None;
    }
    let (load, store) = (&w[0], &w[1]);
    if load.opcode == Opcode::LoadParam && store.opcode == Opcode::StoreVar && store.dest == load.dest {
        return Some((2, vec![load.clone()]));
    }
    None
}

fn pat_store_then_load_becomes_move(w: &[Instruction]) -> MatchResult {
    if w.len() < 2 {
        return None;
    }
    let (store, load) = (&w[0], &w[1]);
    if store.opcode == Opcode::StoreVar && load.opcode == Opcode::LoadVar && store.symbol == load.symbol
        && store.symbol.is_some()
    {
        let rewritten = vec![
            store.clone(),
            Instruction::mov(load.dest, store.dest).with_comment("peephole: store-then-load -> move"),
        ];
        return Some((2, rewritten));
    }
    None
}

/// Constant-parameter SMC setup followed by a call: collapses a pair of
/// `LoadConst; SMCParam` setups into plain register arguments on `Call`
/// (§8 scenario 5).
fn pat_smc_param_to_call(w: &[Instruction]) -> MatchResult {
    if w.len() < 5 {
        return None;
    }
    let (l1, p1, l2, p2, call) = (&w[0], &w[1], &w[2], &w[3], &w[4]);
    let is_setup = |load: &Instruction, param: &Instruction| {
        load.opcode == Opcode::LoadConst && param.opcode == Opcode::SMCParam && param.src1 == load.dest
    };
    if is_setup(l1, p1) && is_setup(l2, p2) && call.opcode == Opcode::Call {
        let rewritten = vec![
            l1.clone(),
            l2.clone(),
            Instruction::call(call.dest, call.symbol.expect("callee"), l1.dest, l2.dest)
                .with_comment("peephole: smc-param setup -> direct register args"),
        ];
        return Some((5, rewritten));
    }
    None
}

fn patterns() -> Vec<PeepholePattern> {
    vec![
        PeepholePattern { name: "load-zero-to-xor", matcher: pat_load_zero_to_xor },
        PeepholePattern { name: "load-const-add-to-inc", matcher: pat_load_const_add_to_inc },
        PeepholePattern { name: "load-pow2-mul-to-shift", matcher: pat_load_pow2_mul_to_shift },
        PeepholePattern { name: "jump-label-jump", matcher: pat_jump_label_jump },
        PeepholePattern { name: "duplicate-load-var", matcher: pat_duplicate_load_var },
        PeepholePattern { name: "drop-redundant-param-store", matcher: pat_drop_redundant_param_store },
        PeepholePattern { name: "store-then-load-becomes-move", matcher: pat_store_then_load_becomes_move },
        PeepholePattern { name: "smc-param-to-call", matcher: pat_smc_param_to_call },
    ]
}

/// The MIR peephole pass. Owns nothing between runs; the pattern table is
/// rebuilt each call since matchers are zero-sized function pointers.
pub struct MirPeephole {
    max_sweeps: usize,
}

impl MirPeephole {
    pub fn new(max_sweeps: usize) -> Self {
        MirPeephole { max_sweeps }
    }

    fn sweep_once(&self, f: &mut Function, patterns: &[PeepholePattern]) -> bool {
        let mut out = Vec::with_capacity(f.instructions.len());
        let mut i = 0;
        let mut changed = false;
        while i < f.instructions.len() {
            let window = &f.instructions[i..];
            let mut matched = false;
            for pat in patterns {
                if let Some((consumed, replacement)) = (pat.matcher)(window) {
                    trace!("peephole `{}` matched in `{}` at {i}", pat.name, f.name);
                    out.extend(replacement);
                    i += consumed;
                    matched = true;
                    changed = true;
                    break;
                }
            }
            if !matched {
                out.push(f.instructions[i].clone());
                i += 1;
            }
        }
        f.instructions = out;
        changed
    }
}

impl Pass for MirPeephole {
    fn name(&self) -> &'static str {
        "mir-peephole"
    }

    fn run(&mut self, module: &mut Module) -> CoreResult<bool> {
        let patterns = patterns();
        let mut changed = false;
        for f in module.functions_mut() {
            for _ in 0..self.max_sweeps {
                if !self.sweep_once(f, &patterns) {
                    break;
                }
                changed = true;
            }
            f.recompute_register_sets();
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{intern, Reg};
    use crate::ir::Function;

    fn reg(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn inc_sequence_from_small_constant_add() {
        // §8 scenario 3: LoadConst r5,3; Add r4,r4,r5 (r4 mapped to B)
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 6;
        let mut add = Instruction::binop(Opcode::Add, reg(4), reg(4), reg(5));
        add.phys_dest = Some(PhysReg::B);
        f.instructions = vec![Instruction::load_const(reg(5), 3), add];

        let mut module = Module::new();
        module.add_function(f);

        MirPeephole::new(10).run(&mut module).unwrap();
        let f = module.function(intern("f")).unwrap();
        assert_eq!(f.instructions.len(), 3);
        assert!(f.instructions.iter().all(|i| i.opcode == Opcode::Inc));
    }

    #[test]
    fn load_zero_becomes_xor() {
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 2;
        f.instructions = vec![Instruction::load_const(reg(1), 0)];
        let mut module = Module::new();
        module.add_function(f);

        MirPeephole::new(10).run(&mut module).unwrap();
        let f = module.function(intern("f")).unwrap();
        assert_eq!(f.instructions[0].opcode, Opcode::Xor);
    }

    #[test]
    fn smc_param_setup_collapses_into_call() {
        // §8 scenario 5
        let mut f = Function::new(intern("f"), vec![]);
        f.next_register = 3;
        f.instructions = vec![
            Instruction::load_const(reg(1), 5),
            Instruction::new(Opcode::SMCParam).with_imm(1).with_src1(reg(1)),
            Instruction::load_const(reg(2), 7),
            Instruction::new(Opcode::SMCParam).with_imm(2).with_src1(reg(2)),
            Instruction::call(Reg::NONE, intern("foo"), Reg::NONE, Reg::NONE),
        ];
        let mut module = Module::new();
        module.add_function(f);

        MirPeephole::new(10).run(&mut module).unwrap();
        let f = module.function(intern("f")).unwrap();
        assert_eq!(f.instructions.len(), 3);
        assert_eq!(f.instructions[2].opcode, Opcode::Call);
        assert_eq!(f.instructions[2].src1, reg(1));
        assert_eq!(f.instructions[2].src2, reg(2));
    }
}
