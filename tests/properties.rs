//! Property-based coverage for the confluence/idempotence invariants of §8
//! that are naturally proptest-shaped: constant folding is idempotent, and
//! DCE is idempotent and monotone-decreasing in instruction count.

use proptest::prelude::*;

use minzc_core::common::{intern, Reg};
use minzc_core::ir::{Function, Instruction, Module, Opcode};
use minzc_core::pass::Pass;
use minzc_core::passes::{ConstFold, Dce};

/// A small arithmetic opcode set, all binary-foldable, for building chains
/// of `LoadConst` + arithmetic that constant folding should collapse.
fn arith_op() -> impl Strategy<Value = Opcode> {
    prop_oneof![
        Just(Opcode::Add),
        Just(Opcode::Sub),
        Just(Opcode::Mul),
        Just(Opcode::And),
        Just(Opcode::Or),
        Just(Opcode::Xor),
    ]
}

fn build_chain(seed: i64, ops: &[(Opcode, i64)]) -> Function {
    let mut f = Function::new(intern("chain"), vec![]);
    let mut next = 1u32;
    let mut fresh = || {
        let r = Reg(next);
        next += 1;
        r
    };
    let mut acc = fresh();
    f.instructions.push(Instruction::load_const(acc, seed));
    for (op, imm) in ops {
        let operand = fresh();
        f.instructions.push(Instruction::load_const(operand, *imm));
        let dest = fresh();
        f.instructions.push(Instruction::binop(*op, dest, acc, operand));
        acc = dest;
    }
    f.instructions.push(Instruction::ret(acc));
    f.next_register = next;
    f.recompute_register_sets();
    f
}

proptest! {
    #[test]
    fn const_fold_is_idempotent_over_arithmetic_chains(
        seed in -1000i64..1000,
        ops in prop::collection::vec((arith_op(), -100i64..100), 0..12),
    ) {
        let f = build_chain(seed, &ops);
        let mut module = Module::new();
        module.add_function(f);

        ConstFold::new().run(&mut module).unwrap();
        let once = format!("{:?}", module.function(intern("chain")).unwrap().instructions);

        ConstFold::new().run(&mut module).unwrap();
        let twice = format!("{:?}", module.function(intern("chain")).unwrap().instructions);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn dce_is_idempotent_and_never_grows_the_instruction_count(
        live_seed in -1000i64..1000,
        dead_values in prop::collection::vec(-1000i64..1000, 0..12),
    ) {
        // one register actually used by the Return, plus a number of
        // LoadConst instructions whose destinations are never read again
        let mut f = Function::new(intern("f"), vec![]);
        let mut next = 1u32;
        let live = Reg(next);
        next += 1;
        f.instructions.push(Instruction::load_const(live, live_seed));
        for v in &dead_values {
            let dead = Reg(next);
            next += 1;
            f.instructions.push(Instruction::load_const(dead, *v));
        }
        f.instructions.push(Instruction::ret(live));
        f.next_register = next;
        f.recompute_register_sets();

        let mut module = Module::new();
        module.add_function(f);

        let before = module.function(intern("f")).unwrap().instructions.len();
        Dce::new().run(&mut module).unwrap();
        let after_one = module.function(intern("f")).unwrap().instructions.len();
        prop_assert!(after_one <= before);

        let snapshot = format!("{:?}", module.function(intern("f")).unwrap().instructions);
        let changed_again = Dce::new().run(&mut module).unwrap();
        let after_two = format!("{:?}", module.function(intern("f")).unwrap().instructions);

        prop_assert!(!changed_again);
        prop_assert_eq!(snapshot, after_two);
        prop_assert_eq!(after_one, module.function(intern("f")).unwrap().instructions.len());
    }
}
