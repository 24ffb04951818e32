use weft_ir::{Function, Inst, Instruction, Value};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Dead store elimination: within a single block, a `Store` to pointer `P` is
/// dead if it is immediately followed by another `Store` to `P` with no
/// intervening `Load` of `P`, `Call`, or second pointer escape in between —
/// the first write is overwritten before anything can observe it (optional
/// pass, gated by `OptimizerConfig::enable_dse`). Complements
/// [`super::alloc_to_phi`], which only removes stores to allocs promoted
/// entirely out of memory; `Dse` catches redundant stores to pointers that
/// never promote (e.g. ones passed to a `Call`).
#[derive(Default)]
pub struct Dse;

impl Pass for Dse {
    fn name(&self) -> &'static str {
        "dse"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let mut changed = false;
        for &block in ctx.program().function(function).blocks() {
            if !ctx.program().block(block).is_attached() {
                continue;
            }
            let insts = ctx.program().block(block).insts().to_vec();
            let mut last_store: Vec<(Value, Inst)> = Vec::new();
            for inst in insts {
                match ctx.program().inst(inst).data.clone() {
                    Instruction::Store { ptr, .. } => {
                        if let Some(&(_, dead)) = last_store.iter().find(|(p, _)| *p == ptr) {
                            if ctx.program_mut().delete_deep(dead).is_ok() {
                                changed = true;
                            }
                        }
                        last_store.retain(|(p, _)| *p != ptr);
                        last_store.push((ptr, inst));
                    }
                    Instruction::Load { ptr } => last_store.retain(|(p, _)| *p != ptr),
                    Instruction::Call { .. } => last_store.clear(),
                    _ => {}
                }
            }
        }
        if changed {
            ctx.report_instr_changed();
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Program, Signature, Terminator, Type};

    #[test]
    fn removes_a_store_overwritten_before_any_load() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let entry = program.function(f).entry();
        let alloc = program.push_back(entry, Instruction::Alloc { inner: Type::Integer(32) });
        let ptr = program.inst_result(alloc).unwrap();
        let one = program.make_constant(Type::Integer(32), 1);
        let two = program.make_constant(Type::Integer(32), 2);
        let first_store = program.push_back(entry, Instruction::Store { ptr, value: one });
        program.push_back(entry, Instruction::Store { ptr, value: two });
        program.set_terminator(entry, Terminator::Return { value: None });

        let mut ctx = Context::new(&mut program);
        let changed = Dse.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(!ctx.program().block(entry).insts().contains(&first_store));
    }

    #[test]
    fn keeps_a_store_read_by_an_intervening_load() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let alloc = program.push_back(entry, Instruction::Alloc { inner: Type::Integer(32) });
        let ptr = program.inst_result(alloc).unwrap();
        let one = program.make_constant(Type::Integer(32), 1);
        let first_store = program.push_back(entry, Instruction::Store { ptr, value: one });
        let load = program.push_back(entry, Instruction::Load { ptr });
        let loaded = program.inst_result(load).unwrap();
        let two = program.make_constant(Type::Integer(32), 2);
        program.push_back(entry, Instruction::Store { ptr, value: two });
        program.set_terminator(entry, Terminator::Return { value: Some(loaded) });

        let mut ctx = Context::new(&mut program);
        Dse.run_on_function(&mut ctx, f).unwrap();
        assert!(ctx.program().block(entry).insts().contains(&first_store));
    }
}
