use weft_ir::{BasicBlock, Function, Inst, Instruction, Terminator, ValueKind};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// (a) Normalizes terminators (`Branch` with equal targets or a constant
/// condition collapses to `Jump`); (b) collapses an empty block ending in
/// `Jump(T)` by rewiring every predecessor straight to `T` and deleting the
/// block, unless `T` already has a distinct predecessor in common with the
/// collapsed block (which a block-keyed Phi cannot represent without losing
/// information), in which case the block is left in place.
#[derive(Default)]
pub struct SimplifyBlocks;

impl Pass for SimplifyBlocks {
    fn name(&self) -> &'static str {
        "simplify-blocks"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let mut changed = false;

        let blocks: Vec<BasicBlock> = ctx.program().function(function).blocks().to_vec();
        for block in blocks {
            if ctx.program().block(block).is_attached() && normalize_terminator(ctx, function, block) {
                changed = true;
            }
        }

        let entry = ctx.program().function(function).entry();
        let blocks: Vec<BasicBlock> = ctx.program().function(function).blocks().to_vec();
        for block in blocks {
            if block == entry || !ctx.program().block(block).is_attached() {
                continue;
            }
            if collapse_if_empty_jump(ctx, function, block) {
                changed = true;
            }
        }

        Ok(changed)
    }
}

fn normalize_terminator(ctx: &mut Context, function: Function, block: BasicBlock) -> bool {
    let Some(Terminator::Branch { cond, if_true, if_false }) = ctx.program().block(block).terminator.clone() else {
        return false;
    };
    if if_true == if_false {
        ctx.program_mut().set_terminator(block, Terminator::Jump { target: if_true });
        ctx.report_graph_changed(function);
        return true;
    }
    if let ValueKind::Constant { ty, value: c } = &ctx.program().value(cond).kind {
        if ty.is_bool() && (*c == 0 || *c == 1) {
            let target = if *c == 1 { if_true } else { if_false };
            ctx.program_mut().set_terminator(block, Terminator::Jump { target });
            ctx.report_graph_changed(function);
            return true;
        }
    }
    false
}

fn collapse_if_empty_jump(ctx: &mut Context, function: Function, block: BasicBlock) -> bool {
    if !ctx.program().block(block).is_empty() {
        return false;
    }
    let Some(Terminator::Jump { target }) = ctx.program().block(block).terminator.clone() else {
        return false;
    };
    let target_block = ctx.program().block_as_value(target);
    if target_block == block {
        return false;
    }

    let block_value = ctx.program().block(block).value;
    let preds = ctx.program().predecessors(function, block);

    // A Phi's sources are keyed by predecessor block, not by edge. If one of
    // `block`'s own predecessors already reaches `target_block` some other
    // way (a converging diamond where both arms funnel through the same
    // upstream block), fanning `block`'s phi sources out to it would
    // overwrite a distinct, already-recorded value instead of adding one.
    // Skip the collapse rather than corrupt the phi.
    let other_target_preds: Vec<BasicBlock> = ctx
        .program()
        .predecessors(function, target_block)
        .into_iter()
        .filter(|&p| p != block)
        .collect();
    if preds.iter().any(|p| other_target_preds.contains(p)) {
        return false;
    }

    rewrite_phi_sources(ctx, target_block, block, &preds);
    ctx.program_mut()
        .replace_all_uses(block_value, target)
        .expect("a block reference and its target share the Void type");
    ctx.program_mut().delete_block(function, block);
    ctx.report_graph_changed(function);
    true
}

/// Every Phi in `target` that has a source for `collapsed` gets that source
/// fanned out to each of `collapsed`'s own predecessors, since a straight
/// `Jump` doesn't transform the value flowing through it.
fn rewrite_phi_sources(ctx: &mut Context, target: BasicBlock, collapsed: BasicBlock, new_preds: &[BasicBlock]) {
    let phi_insts: Vec<Inst> = ctx
        .program()
        .block(target)
        .insts()
        .iter()
        .copied()
        .filter(|&i| ctx.program().inst(i).data.is_phi())
        .collect();
    for phi_inst in phi_insts {
        let Instruction::Phi { sources, .. } = ctx.program().inst(phi_inst).data.clone() else {
            unreachable!("filtered to phis above");
        };
        if let Some(&value_for_collapsed) = sources.get(&collapsed) {
            let mut new_sources = sources;
            new_sources.remove(&collapsed);
            for &pred in new_preds {
                new_sources.insert(pred, value_for_collapsed);
            }
            ctx.program_mut().set_phi_sources(phi_inst, new_sources);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{BinaryOpKind, Program, Signature, Type};
    use std::collections::BTreeMap;

    #[test]
    fn collapses_an_empty_jump_block_and_rewires_phi() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![Type::bool()], Type::Integer(32)));
        let entry = program.function(f).entry();
        let middle = program.create_block(f);
        let other = program.create_block(f);
        let join = program.create_block(f);

        let cond = program.function(f).params[0];
        let middle_value = program.block(middle).value;
        let other_value = program.block(other).value;
        let join_value = program.block(join).value;
        program.set_terminator(entry, Terminator::Branch { cond, if_true: middle_value, if_false: other_value });
        program.set_terminator(middle, Terminator::Jump { target: join_value });

        let twenty = program.make_constant(Type::Integer(32), 20);
        let one = program.make_constant(Type::Integer(32), 1);
        program.push_back(other, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: twenty, rhs: one });
        program.set_terminator(other, Terminator::Jump { target: join_value });

        let ten = program.make_constant(Type::Integer(32), 10);
        let mut sources = BTreeMap::new();
        sources.insert(middle, ten);
        sources.insert(other, twenty);
        let phi = program.push_back(join, Instruction::Phi { ty: Type::Integer(32), sources });
        let phi_value = program.inst_result(phi).unwrap();
        program.set_terminator(join, Terminator::Return { value: Some(phi_value) });

        let mut ctx = Context::new(&mut program);
        let changed = SimplifyBlocks.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(!ctx.program().block(middle).is_attached());
        let Instruction::Phi { sources, .. } = &ctx.program().inst(phi).data else { panic!("expected phi") };
        assert!(sources.contains_key(&entry));
        assert!(sources.contains_key(&other));
        assert!(!sources.contains_key(&middle));
        assert_eq!(sources[&entry], ten);
        assert_eq!(sources[&other], twenty);
    }

    #[test]
    fn refuses_to_collapse_when_predecessors_would_collide() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![Type::bool()], Type::Integer(32)));
        let entry = program.function(f).entry();
        let middle = program.create_block(f);
        let join = program.create_block(f);

        let cond = program.function(f).params[0];
        let middle_value = program.block(middle).value;
        let join_value = program.block(join).value;
        program.set_terminator(entry, Terminator::Branch { cond, if_true: middle_value, if_false: join_value });
        program.set_terminator(middle, Terminator::Jump { target: join_value });

        let ten = program.make_constant(Type::Integer(32), 10);
        let twenty = program.make_constant(Type::Integer(32), 20);
        let mut sources = BTreeMap::new();
        sources.insert(middle, ten);
        sources.insert(entry, twenty);
        let phi = program.push_back(join, Instruction::Phi { ty: Type::Integer(32), sources });
        let phi_value = program.inst_result(phi).unwrap();
        program.set_terminator(join, Terminator::Return { value: Some(phi_value) });

        let mut ctx = Context::new(&mut program);
        let changed = SimplifyBlocks.run_on_function(&mut ctx, f).unwrap();
        assert!(!changed, "collapsing would merge entry's two distinct incoming values");
        assert!(ctx.program().block(middle).is_attached());
    }
}
