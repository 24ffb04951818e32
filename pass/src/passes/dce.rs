use rustc_hash::FxHashSet;

use weft_ir::{BasicBlock, Function, Inst, Program};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Reachability-aware dead code elimination: unlike
/// [`super::dead_instruction_elimination::DeadInstructionElimination`], which
/// only prunes instructions still provably unused *within an attached block*,
/// `Dce` first computes forward reachability from the entry and strips every
/// instruction in a block that reachability already condemns, impure or not —
/// clearing the way for [`super::dead_block_elimination`] to drop the block
/// outright (optional pass, gated by `OptimizerConfig::enable_dce`).
#[derive(Default)]
pub struct Dce;

impl Pass for Dce {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let entry = ctx.program().function(function).entry();
        let reachable = forward_reachable(ctx.program(), entry);

        let unreachable_blocks: Vec<BasicBlock> = ctx
            .program()
            .function(function)
            .blocks()
            .iter()
            .copied()
            .filter(|b| ctx.program().block(*b).is_attached() && !reachable.contains(b))
            .collect();

        let mut changed = false;
        for block in unreachable_blocks {
            let mut insts: Vec<Inst> = ctx.program().block(block).insts().to_vec();
            insts.reverse();
            for inst in insts {
                if ctx.program_mut().delete_deep(inst).is_ok() {
                    changed = true;
                }
            }
        }
        if changed {
            ctx.report_instr_changed();
        }
        Ok(changed)
    }
}

fn forward_reachable(program: &Program, entry: BasicBlock) -> FxHashSet<BasicBlock> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![entry];
    while let Some(b) = stack.pop() {
        if !seen.insert(b) {
            continue;
        }
        for s in program.successors(b) {
            if !seen.contains(&s) {
                stack.push(s);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Instruction, Signature, Terminator, Type};

    #[test]
    fn strips_instructions_from_an_unreachable_block_including_impure_ones() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let entry = program.function(f).entry();
        program.set_terminator(entry, Terminator::Exit);

        let orphan = program.create_block(f);
        let alloc = program.push_back(orphan, Instruction::Alloc { inner: Type::Integer(32) });
        let alloc_value = program.inst_result(alloc).unwrap();
        let one = program.make_constant(Type::Integer(32), 1);
        program.push_back(orphan, Instruction::Store { ptr: alloc_value, value: one });
        program.set_terminator(orphan, Terminator::Exit);

        let mut ctx = Context::new(&mut program);
        let changed = Dce.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(ctx.program().block(orphan).insts().is_empty());
    }
}
