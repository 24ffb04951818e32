use std::collections::BTreeMap;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use weft_analysis::DominatorInfo;
use weft_ir::{BasicBlock, Function, Inst, Instruction, Program, Type, User, Value};

use crate::error::PassError;

/// `mem2reg`: promotes `alloc`/`load`/`store` triples to Phi nodes.
/// Runs once per function, up front, because it is
/// idempotent and its inputs (the promotable allocs) are gone once it has
/// run.
///
/// This is the one pass in the workspace that does not go through
/// [`crate::context::Context`]'s change-tracking: it always runs exactly
/// once, never loops to a fixed point, so there is nothing to report back.
pub fn run(program: &mut Program, function: Function) -> Result<bool, PassError> {
    let allocs = collect_promotable_allocs(program, function);
    if allocs.is_empty() {
        return Ok(false);
    }
    let dom = DominatorInfo::compute(program, function);
    for (alloc_inst, alloc_value, pointee_ty) in allocs {
        promote(program, &dom, alloc_inst, alloc_value, pointee_ty)?;
    }
    Ok(true)
}

fn collect_promotable_allocs(program: &Program, function: Function) -> Vec<(Inst, Value, Type)> {
    let mut out = Vec::new();
    for &block in program.function(function).blocks() {
        if !program.block(block).is_attached() {
            continue;
        }
        for &inst in program.block(block).insts() {
            if let Instruction::Alloc { inner } = &program.inst(inst).data {
                let value = program.inst_result(inst).expect("alloc always produces a result");
                if is_promotable(program, value) {
                    out.push((inst, value, inner.clone()));
                }
            }
        }
    }
    out
}

/// An alloc is promotable if every use of its result is as the pointer
/// operand of a `Load` or `Store` — never as a stored value, a call
/// argument, or a branch/jump operand, any of which would let its address
/// escape the function in a way a register can't represent.
fn is_promotable(program: &Program, alloc_value: Value) -> bool {
    for &user in program.value(alloc_value).users() {
        let matches = match user {
            User::Inst(inst) => match &program.inst(inst).data {
                Instruction::Load { ptr } => *ptr == alloc_value,
                Instruction::Store { ptr, .. } => *ptr == alloc_value,
                _ => false,
            },
            User::Terminator(_) => false,
        };
        if !matches {
            return false;
        }
    }
    true
}

fn promote(
    program: &mut Program,
    dom: &DominatorInfo,
    alloc_inst: Inst,
    alloc_value: Value,
    pointee_ty: Type,
) -> Result<(), PassError> {
    let mut store_blocks: FxHashSet<BasicBlock> = FxHashSet::default();
    let mut loads: Vec<Inst> = Vec::new();
    let mut stores: Vec<Inst> = Vec::new();
    for &user in program.value(alloc_value).users() {
        if let User::Inst(inst) = user {
            match &program.inst(inst).data {
                Instruction::Store { .. } => {
                    store_blocks.insert(program.inst(inst).block);
                    stores.push(inst);
                }
                Instruction::Load { .. } => loads.push(inst),
                _ => unreachable!("checked by is_promotable"),
            }
        }
    }

    let phi_for_block = insert_phis(program, dom, &pointee_ty, &store_blocks);
    debug!("alloc-to-phi: inserted {} phi(s) for one promoted alloc", phi_for_block.len());

    for load in loads {
        let block = program.inst(load).block;
        let index = program.block(block).insts().iter().position(|&i| i == load).unwrap();
        let reaching = reaching_definition(program, dom, alloc_value, &phi_for_block, block, index);
        let replacement = reaching.unwrap_or_else(|| program.make_undef(pointee_ty.clone()));
        let result = program.inst_result(load).expect("load always produces a result");
        program.replace_all_uses(result, replacement)?;
        program.delete_deep(load)?;
    }

    for (&block, &phi_value) in &phi_for_block {
        let phi_inst = program
            .block(block)
            .insts()
            .iter()
            .copied()
            .find(|&i| program.inst_result(i) == Some(phi_value))
            .expect("phi was just inserted into this block");

        if program.value(phi_value).users().is_empty() {
            program.delete_deep(phi_inst)?;
            continue;
        }

        // `predecessors` reports one entry per incoming edge, so a block with
        // two edges from the same predecessor (e.g. a degenerate `branch %c,
        // join, join`) lists it twice; dedupe before comparing against
        // `sources`, which is keyed by predecessor block and so can never
        // hold more than one entry per predecessor regardless.
        let preds: FxHashSet<BasicBlock> =
            program.predecessors(program.block(block).function, block).into_iter().collect();
        let mut sources = BTreeMap::new();
        for pred in preds.iter().copied() {
            let start_index = program.block(pred).insts().len();
            if let Some(value) = reaching_definition(program, dom, alloc_value, &phi_for_block, pred, start_index) {
                sources.insert(pred, value);
            }
        }
        if sources.len() != preds.len() {
            return Err(PassError::UndefinedValue);
        }
        program.set_phi_sources(phi_inst, sources);
    }

    for store in stores {
        program.delete_deep(store)?;
    }
    program.delete_deep(alloc_inst)?;
    Ok(())
}

/// Places Phis at the iterated dominance frontier of `store_blocks`: a
/// worklist over "frontiers of frontiers" so that a Phi inserted at one
/// merge point can itself force a Phi at the next one out.
fn insert_phis(
    program: &mut Program,
    dom: &DominatorInfo,
    pointee_ty: &Type,
    store_blocks: &FxHashSet<BasicBlock>,
) -> FxHashMap<BasicBlock, Value> {
    let mut has_phi: FxHashMap<BasicBlock, Value> = FxHashMap::default();
    let mut worklist: Vec<BasicBlock> = store_blocks.iter().copied().collect();
    let mut queued: FxHashSet<BasicBlock> = store_blocks.clone();
    while let Some(block) = worklist.pop() {
        for &frontier_block in dom.frontier(block) {
            if has_phi.contains_key(&frontier_block) {
                continue;
            }
            let inst = program.insert_front(
                frontier_block,
                Instruction::Phi { ty: pointee_ty.clone(), sources: BTreeMap::new() },
            );
            let result = program.inst_result(inst).expect("phi always produces a result");
            has_phi.insert(frontier_block, result);
            if queued.insert(frontier_block) {
                worklist.push(frontier_block);
            }
        }
    }
    has_phi
}

/// Finds the value that would be observed by a read of `alloc_value`
/// occurring at `insts[start_index]` (exclusive) of `start_block`: scan
/// backward within the block for a `Store` to `alloc_value`, then check for
/// a Phi at the block's head, then recurse into the immediate dominator.
/// Returns `None` once the search runs off the top of the dominator tree,
/// meaning the read observes no write — an uninitialized alloc.
fn reaching_definition(
    program: &Program,
    dom: &DominatorInfo,
    alloc_value: Value,
    phi_for_block: &FxHashMap<BasicBlock, Value>,
    start_block: BasicBlock,
    start_index: usize,
) -> Option<Value> {
    let insts = program.block(start_block).insts();
    for &inst in insts[..start_index].iter().rev() {
        if let Instruction::Store { ptr, value } = &program.inst(inst).data {
            if *ptr == alloc_value {
                return Some(*value);
            }
        }
    }
    if let Some(&phi_value) = phi_for_block.get(&start_block) {
        return Some(phi_value);
    }
    let idom = dom.parent(start_block)?;
    let idom_len = program.block(idom).insts().len();
    reaching_definition(program, dom, alloc_value, phi_for_block, idom, idom_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Signature, Terminator};

    #[test]
    fn promotes_an_if_else_merge_to_a_phi() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![Type::bool()], Type::Integer(32)));
        let entry = program.function(f).entry();
        let then_block = program.create_block(f);
        let else_block = program.create_block(f);
        let join = program.create_block(f);

        let alloc = program.push_back(entry, Instruction::Alloc { inner: Type::Integer(32) });
        let alloc_value = program.inst_result(alloc).unwrap();
        let cond = program.function(f).params[0];
        let then_value = program.block(then_block).value;
        let else_value = program.block(else_block).value;
        program.set_terminator(entry, Terminator::Branch { cond, if_true: then_value, if_false: else_value });

        let one = program.make_constant(Type::Integer(32), 1);
        program.push_back(then_block, Instruction::Store { ptr: alloc_value, value: one });
        let join_value = program.block(join).value;
        program.set_terminator(then_block, Terminator::Jump { target: join_value });

        let two = program.make_constant(Type::Integer(32), 2);
        program.push_back(else_block, Instruction::Store { ptr: alloc_value, value: two });
        program.set_terminator(else_block, Terminator::Jump { target: join_value });

        let load = program.push_back(join, Instruction::Load { ptr: alloc_value });
        let loaded = program.inst_result(load).unwrap();
        program.set_terminator(join, Terminator::Return { value: Some(loaded) });

        let changed = run(&mut program, f).unwrap();
        assert!(changed);
        assert!(program.block(join).insts().iter().any(|&i| program.inst(i).data.is_phi()));
        assert!(!program.block(join).insts().iter().any(|&i| program.inst(i).data.is_load()));
        assert_eq!(program.block(entry).insts().len(), 0);
    }

    #[test]
    fn leaves_non_promotable_allocs_alone() {
        let mut program = Program::new();
        let callee = program.declare_function("callee", Signature::new(vec![Type::pointer_to(Type::Integer(32))], Type::Void));
        let callee_entry = program.function(callee).entry();
        program.set_terminator(callee_entry, Terminator::Return { value: None });

        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let alloc = program.push_back(entry, Instruction::Alloc { inner: Type::Integer(32) });
        let alloc_value = program.inst_result(alloc).unwrap();
        let callee_value = program.function(callee).value;
        program.push_back(entry, Instruction::Call { callee: callee_value, args: vec![alloc_value] });
        let zero = program.make_constant(Type::Integer(32), 0);
        program.set_terminator(entry, Terminator::Return { value: Some(zero) });

        let changed = run(&mut program, f).unwrap();
        assert!(!changed);
        assert!(program.block(entry).insts().iter().any(|&i| program.inst(i).data.is_alloc()));
    }
}
