use std::collections::BTreeMap;

use weft_ir::{BasicBlock, Function, Inst, Instruction, Program, Terminator, Type, Value, ValueKind};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Folds `BinaryOp`/`UnaryOp` over two constants, degenerate/constant
/// `Branch`es, and single-source `Phi`s.
#[derive(Default)]
pub struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let mut changed = false;
        let blocks: Vec<BasicBlock> = ctx.program().function(function).blocks().to_vec();
        for block in blocks {
            if !ctx.program().block(block).is_attached() {
                continue;
            }
            let insts: Vec<Inst> = ctx.program().block(block).insts().to_vec();
            for inst in insts {
                if fold_instruction(ctx, inst)? {
                    changed = true;
                }
            }
            if fold_terminator(ctx, function, block)? {
                changed = true;
            }
        }
        Ok(changed)
    }
}

fn as_constant(program: &Program, value: Value) -> Option<(Type, i64)> {
    match &program.value(value).kind {
        ValueKind::Constant { ty, value } => Some((ty.clone(), *value)),
        _ => None,
    }
}

fn single_distinct_source(sources: &BTreeMap<BasicBlock, Value>) -> Option<Value> {
    let mut iter = sources.values();
    let first = *iter.next()?;
    if iter.all(|&v| v == first) {
        Some(first)
    } else {
        None
    }
}

fn fold_instruction(ctx: &mut Context, inst: Inst) -> Result<bool, PassError> {
    let data = ctx.program().inst(inst).data.clone();
    let replacement = match &data {
        Instruction::BinaryOp { op, lhs, rhs } => {
            match (as_constant(ctx.program(), *lhs), as_constant(ctx.program(), *rhs)) {
                (Some((ty, a)), Some((_, b))) => {
                    let value = op.evaluate(&ty, a, b).map_err(|_| PassError::DivByZero)?;
                    let result_ty = op.result_type(&ty);
                    Some(ctx.program_mut().make_constant(result_ty, value))
                }
                _ => None,
            }
        }
        Instruction::UnaryOp { op, value } => as_constant(ctx.program(), *value).map(|(ty, v)| {
            let result = op.evaluate(&ty, v);
            ctx.program_mut().make_constant(ty, result)
        }),
        Instruction::Phi { sources, .. } => single_distinct_source(sources),
        _ => None,
    };
    let Some(replacement) = replacement else { return Ok(false) };
    let result = ctx.program().inst_result(inst).expect("foldable instructions always produce a result");
    ctx.program_mut().replace_all_uses(result, replacement)?;
    ctx.program_mut().delete_deep(inst)?;
    ctx.report_instr_changed();
    Ok(true)
}

fn fold_terminator(ctx: &mut Context, function: Function, block: BasicBlock) -> Result<bool, PassError> {
    let Some(Terminator::Branch { cond, if_true, if_false }) = ctx.program().block(block).terminator.clone() else {
        return Ok(false);
    };
    if if_true == if_false {
        ctx.program_mut().set_terminator(block, Terminator::Jump { target: if_true });
        ctx.report_graph_changed(function);
        return Ok(true);
    }
    if let Some((ty, c)) = as_constant(ctx.program(), cond) {
        if !ty.is_bool() {
            return Ok(false);
        }
        if c != 0 && c != 1 {
            return Err(PassError::BadBool);
        }
        let target = if c == 1 { if_true } else { if_false };
        ctx.program_mut().set_terminator(block, Terminator::Jump { target });
        ctx.report_graph_changed(function);
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{BinaryOpKind, Program, Signature};

    #[test]
    fn folds_a_constant_add_into_the_return() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let two = program.make_constant(Type::Integer(32), 2);
        let three = program.make_constant(Type::Integer(32), 3);
        let add = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: two, rhs: three });
        let result = program.inst_result(add).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(result) });

        let mut ctx = Context::new(&mut program);
        let changed = ConstantFolding.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(ctx.program().block(entry).insts().is_empty());
        match ctx.program().block(entry).terminator.as_ref().unwrap() {
            Terminator::Return { value: Some(v) } => {
                assert_eq!(ctx.program().value(*v).kind, ValueKind::Constant { ty: Type::Integer(32), value: 5 });
            }
            _ => panic!("expected return"),
        }
    }

    #[test]
    fn division_by_zero_is_fatal_rather_than_folded() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let one = program.make_constant(Type::Integer(32), 1);
        let zero = program.make_constant(Type::Integer(32), 0);
        let div = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Div, lhs: one, rhs: zero });
        let result = program.inst_result(div).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(result) });

        let mut ctx = Context::new(&mut program);
        let err = ConstantFolding.run_on_function(&mut ctx, f).unwrap_err();
        assert!(matches!(err, PassError::DivByZero));
    }
}
