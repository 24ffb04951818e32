use rustc_hash::FxHashSet;

use weft_ir::{Function, Inst, Program, Terminator, Value, ValueKind};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Deletes every instruction not reachable backward, via operand edges, from
/// an impure instruction or a function-return operand.
/// `Program::remove` already refuses to delete anything still held as
/// an operand by a live use site (e.g. a branch condition), so an imprecise
/// root set only costs some missed cleanup, never unsoundness.
#[derive(Default)]
pub struct DeadInstructionElimination;

impl Pass for DeadInstructionElimination {
    fn name(&self) -> &'static str {
        "dead-instruction-elimination"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let live = compute_live_set(ctx.program(), function);
        let mut dead: Vec<Inst> = Vec::new();
        for &block in ctx.program().function(function).blocks() {
            if !ctx.program().block(block).is_attached() {
                continue;
            }
            for &inst in ctx.program().block(block).insts() {
                if !live.contains(&inst) {
                    dead.push(inst);
                }
            }
        }

        let mut changed = false;
        let mut progress = true;
        while progress {
            progress = false;
            dead.retain(|&inst| match ctx.program_mut().delete_deep(inst) {
                Ok(()) => {
                    changed = true;
                    progress = true;
                    false
                }
                Err(_still_in_use) => true,
            });
        }
        if changed {
            ctx.report_instr_changed();
        }
        Ok(changed)
    }
}

fn compute_live_set(program: &Program, function: Function) -> FxHashSet<Inst> {
    let mut live = FxHashSet::default();
    let mut worklist: Vec<Value> = Vec::new();

    for &block in program.function(function).blocks() {
        if !program.block(block).is_attached() {
            continue;
        }
        for &inst in program.block(block).insts() {
            if !program.is_pure_instruction(inst) {
                mark_live(program, inst, &mut live, &mut worklist);
            }
        }
        if let Some(Terminator::Return { value: Some(v) }) = &program.block(block).terminator {
            worklist.push(*v);
        }
    }

    while let Some(value) = worklist.pop() {
        if let ValueKind::Instruction { inst, .. } = &program.value(value).kind {
            mark_live(program, *inst, &mut live, &mut worklist);
        }
    }
    live
}

fn mark_live(program: &Program, inst: Inst, live: &mut FxHashSet<Inst>, worklist: &mut Vec<Value>) {
    if live.insert(inst) {
        worklist.extend(program.inst(inst).data.operands());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{BinaryOpKind, Instruction, Signature, Type};

    #[test]
    fn deletes_an_unused_pure_computation() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let a = program.make_constant(Type::Integer(32), 1);
        let b = program.make_constant(Type::Integer(32), 2);
        let _unused = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: a, rhs: b });
        let five = program.make_constant(Type::Integer(32), 5);
        program.set_terminator(entry, Terminator::Return { value: Some(five) });

        let mut ctx = Context::new(&mut program);
        let changed = DeadInstructionElimination.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(ctx.program().block(entry).insts().is_empty());
    }

    #[test]
    fn keeps_an_impure_store_even_if_unused() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let entry = program.function(f).entry();
        let alloc = program.push_back(entry, Instruction::Alloc { inner: Type::Integer(32) });
        let alloc_value = program.inst_result(alloc).unwrap();
        let one = program.make_constant(Type::Integer(32), 1);
        program.push_back(entry, Instruction::Store { ptr: alloc_value, value: one });
        program.set_terminator(entry, Terminator::Return { value: None });

        let mut ctx = Context::new(&mut program);
        DeadInstructionElimination.run_on_function(&mut ctx, f).unwrap();
        assert_eq!(ctx.program().block(entry).insts().len(), 2);
    }
}
