use rustc_hash::FxHashSet;

use weft_ir::{BasicBlock, Function, Program};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Deletes every block not reachable forward from the entry via successor
/// edges.
#[derive(Default)]
pub struct DeadBlockElimination;

impl Pass for DeadBlockElimination {
    fn name(&self) -> &'static str {
        "dead-block-elimination"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let entry = ctx.program().function(function).entry();
        let reachable = forward_reachable(ctx.program(), entry);
        let dead: Vec<BasicBlock> = ctx
            .program()
            .function(function)
            .blocks()
            .iter()
            .copied()
            .filter(|&b| ctx.program().block(b).is_attached() && !reachable.contains(&b))
            .collect();
        if dead.is_empty() {
            return Ok(false);
        }
        for block in dead {
            ctx.program_mut().delete_block(function, block);
        }
        ctx.report_graph_changed(function);
        Ok(true)
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
    use weft_ir::{Signature, Terminator, Type};

    #[test]
    fn deletes_an_orphan_block() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let entry = program.function(f).entry();
        program.set_terminator(entry, Terminator::Exit);
        let orphan = program.create_block(f);
        program.set_terminator(orphan, Terminator::Exit);

        let mut ctx = Context::new(&mut program);
        let changed = DeadBlockElimination.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(!ctx.program().block(orphan).is_attached());
        assert_eq!(ctx.program().function(f).blocks().len(), 1);
    }
}
