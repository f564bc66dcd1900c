//! Lowers the toy AST (§front) into a MIR [`Module`] with a single `main`
//! function. This is the "straightforward plumbing" stand-in noted in the
//! module docs: real front ends live outside this core; this one exists
//! only so `mirc` has something to feed the optimizer end to end.

use crate::common::{intern, Id, Reg};
use crate::front::ast::{BOp, Expr, Program, Stmt};
use crate::ir::function::{Function, Local};
use crate::ir::instr::Instruction;
use crate::ir::module::Module;
use crate::ir::opcode::Opcode;

const PRINT_EXTERN: &str = "rt_print";
const READ_EXTERN: &str = "rt_read";

struct Lowerer<'f> {
    f: &'f mut Function,
    next_label: usize,
}

impl<'f> Lowerer<'f> {
    fn fresh_label(&mut self, tag: &str) -> Id {
        self.next_label += 1;
        intern(format!("if_{}_{tag}", self.next_label))
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(name, expr) => {
                let value = self.lower_expr(expr);
                self.f.locals.entry(*name).or_insert_with(|| Local { name: *name, ty: intern("int") });
                self.f
                    .instructions
                    .push(Instruction::new(Opcode::StoreVar).with_dest(value).with_symbol(*name));
            }
            Stmt::Print(expr) => {
                let value = self.lower_expr(expr);
                self.f
                    .instructions
                    .push(Instruction::call(Reg::NONE, intern(PRINT_EXTERN), value, Reg::NONE));
            }
            Stmt::Read(expr) => {
                let dest = self.f.fresh_register();
                self.f
                    .instructions
                    .push(Instruction::call(dest, intern(READ_EXTERN), Reg::NONE, Reg::NONE));
                if let Expr::Var(name) = expr {
                    self.f.locals.entry(*name).or_insert_with(|| Local { name: *name, ty: intern("int") });
                    self.f
                        .instructions
                        .push(Instruction::new(Opcode::StoreVar).with_dest(dest).with_symbol(*name));
                }
            }
            Stmt::If { guard, tt, ff } => {
                let cond = self.lower_expr(guard);
                let else_label = self.fresh_label("else");
                let end_label = self.fresh_label("end");
                self.f.instructions.push(Instruction::jump_if_not(cond, else_label));
                self.lower_stmts(tt);
                self.f.instructions.push(Instruction::jump(end_label));
                self.f.instructions.push(Instruction::label_def(else_label));
                self.lower_stmts(ff);
                self.f.instructions.push(Instruction::label_def(end_label));
            }
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Reg {
        match expr {
            Expr::Const(n) => {
                let dest = self.f.fresh_register();
                self.f.instructions.push(Instruction::load_const(dest, *n));
                dest
            }
            Expr::Var(name) => {
                let dest = self.f.fresh_register();
                self.f
                    .instructions
                    .push(Instruction::new(Opcode::LoadVar).with_dest(dest).with_symbol(*name));
                dest
            }
            Expr::Negate(inner) => {
                let src = self.lower_expr(inner);
                let dest = self.f.fresh_register();
                self.f
                    .instructions
                    .push(Instruction::new(Opcode::Neg).with_dest(dest).with_src1(src));
                dest
            }
            Expr::BOp { op, lhs, rhs } => {
                let l = self.lower_expr(lhs);
                let r = self.lower_expr(rhs);
                let dest = self.f.fresh_register();
                let opcode = match op {
                    BOp::Mul => Opcode::Mul,
                    BOp::Div => Opcode::Div,
                    BOp::Add => Opcode::Add,
                    BOp::Sub => Opcode::Sub,
                    BOp::Lt => Opcode::Lt,
                };
                self.f.instructions.push(Instruction::binop(opcode, dest, l, r));
                dest
            }
        }
    }
}

/// Lower a parsed program into a single-function MIR module.
pub fn lower(program: &Program) -> Module {
    let mut f = Function::new(intern("main"), vec![]);
    {
        let mut lowerer = Lowerer { f: &mut f, next_label: 0 };
        lowerer.lower_stmts(&program.stmts);
    }
    f.instructions.push(Instruction::ret(Reg::NONE));
    f.recompute_register_sets();
    f.attrs.insert("entry".to_string(), "true".to_string());

    let mut module = Module::new();
    module.externs.insert(intern(PRINT_EXTERN));
    module.externs.insert(intern(READ_EXTERN));
    module.add_function(f);
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse;

    #[test]
    fn assignment_and_print_lower_to_store_and_call() {
        let program = parse("x := 1 + 2\n$print x").unwrap();
        let module = lower(&program);
        let main = module.function(intern("main")).unwrap();
        assert!(main.instructions.iter().any(|i| i.opcode == Opcode::StoreVar));
        assert!(main
            .instructions
            .iter()
            .any(|i| i.opcode == Opcode::Call && i.symbol == Some(intern(PRINT_EXTERN))));
    }

    #[test]
    fn an_if_statement_lowers_to_a_conditional_jump_and_two_labels() {
        let program = parse("$if 1 < 2 { x := 1 } { x := 2 }").unwrap();
        let module = lower(&program);
        let main = module.function(intern("main")).unwrap();
        assert_eq!(main.instructions.iter().filter(|i| i.opcode == Opcode::Label).count(), 2);
        assert!(main.instructions.iter().any(|i| i.opcode == Opcode::JumpIfNot));
    }
}
