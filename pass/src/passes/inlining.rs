use rustc_hash::FxHashMap;

use weft_ir::{Function, Inst, Instruction, Program, Terminator, Value, ValueKind};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Inlines direct calls to a restricted class of callee: a single-block
/// function (its entry, terminated by `Return`) that itself contains no
/// `Call`, so inlining never has to recurse into a callee's own call sites
/// or worry about mutual recursion (optional pass, gated by
/// `OptimizerConfig::enable_inlining`). Splices a fresh copy of the callee's
/// instructions in before the call site and rewrites the call's result to
/// the (possibly) returned value.
#[derive(Default)]
pub struct Inlining;

impl Pass for Inlining {
    fn name(&self) -> &'static str {
        "inlining"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let candidates: Vec<Inst> = ctx
            .program()
            .function(function)
            .blocks()
            .iter()
            .filter(|b| ctx.program().block(**b).is_attached())
            .flat_map(|&b| ctx.program().block(b).insts().to_vec())
            .filter(|&inst| is_inlinable_call(ctx.program(), function, inst))
            .collect();

        let mut changed = false;
        for call_inst in candidates {
            inline_one(ctx.program_mut(), call_inst);
            changed = true;
        }
        if changed {
            ctx.report_graph_changed(function);
        }
        Ok(changed)
    }
}

fn is_inlinable_call(program: &Program, caller: Function, inst: Inst) -> bool {
    let Instruction::Call { callee, .. } = &program.inst(inst).data else { return false };
    let ValueKind::FunctionRef(callee_fn) = program.value(*callee).kind.clone() else { return false };
    if callee_fn == caller {
        return false;
    }
    let blocks = program.function(callee_fn).blocks();
    if blocks.len() != 1 {
        return false;
    }
    let entry = blocks[0];
    if !matches!(program.block(entry).terminator, Some(Terminator::Return { .. })) {
        return false;
    }
    program.block(entry).insts().iter().all(|&i| !program.inst(i).data.is_call())
}

fn inline_one(program: &mut Program, call_inst: Inst) {
    let Instruction::Call { callee, args } = program.inst(call_inst).data.clone() else {
        unreachable!("checked by is_inlinable_call");
    };
    let ValueKind::FunctionRef(callee_fn) = program.value(callee).kind.clone() else {
        unreachable!("checked by is_inlinable_call");
    };

    let entry = program.function(callee_fn).blocks()[0];
    let params = program.function(callee_fn).params.clone();
    let mut value_map: FxHashMap<Value, Value> = FxHashMap::default();
    for (param, arg) in params.iter().zip(args.iter()) {
        value_map.insert(*param, *arg);
    }

    for inst in program.block(entry).insts().to_vec() {
        let resolved = resolve(&value_map, &program.inst(inst).data.clone());
        let new_inst = program.insert_before(call_inst, resolved);
        if let Some(old_result) = program.inst_result(inst) {
            let new_result = program.inst_result(new_inst).expect("cloned instruction has the same shape");
            value_map.insert(old_result, new_result);
        }
    }

    let returned = match &program.block(entry).terminator {
        Some(Terminator::Return { value: Some(v) }) => Some(resolve_value(&value_map, *v)),
        _ => None,
    };

    if let Some(call_result) = program.inst_result(call_inst) {
        if let Some(returned) = returned {
            program
                .replace_all_uses(call_result, returned)
                .expect("the callee's return type matches the call's declared result type");
        }
    }
    program.delete_deep(call_inst).expect("every use of the call's result was just rewritten away");
}

fn resolve_value(map: &FxHashMap<Value, Value>, value: Value) -> Value {
    map.get(&value).copied().unwrap_or(value)
}

fn resolve(map: &FxHashMap<Value, Value>, data: &Instruction) -> Instruction {
    match data {
        Instruction::Alloc { inner } => Instruction::Alloc { inner: inner.clone() },
        Instruction::Store { ptr, value } => {
            Instruction::Store { ptr: resolve_value(map, *ptr), value: resolve_value(map, *value) }
        }
        Instruction::Load { ptr } => Instruction::Load { ptr: resolve_value(map, *ptr) },
        Instruction::BinaryOp { op, lhs, rhs } => {
            Instruction::BinaryOp { op: *op, lhs: resolve_value(map, *lhs), rhs: resolve_value(map, *rhs) }
        }
        Instruction::UnaryOp { op, value } => Instruction::UnaryOp { op: *op, value: resolve_value(map, *value) },
        Instruction::Phi { ty, sources } => {
            // Unreachable inside a single-block callee (a Phi needs more than
            // one predecessor), kept only so this match stays exhaustive.
            Instruction::Phi { ty: ty.clone(), sources: sources.clone() }
        }
        Instruction::Call { callee, args } => Instruction::Call {
            callee: resolve_value(map, *callee),
            args: args.iter().map(|&a| resolve_value(map, a)).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{BinaryOpKind, Signature, Type};

    #[test]
    fn inlines_a_leaf_call_and_rewrites_its_result() {
        let mut program = Program::new();
        let double = program.declare_function("double", Signature::new(vec![Type::Integer(32)], Type::Integer(32)));
        let double_entry = program.function(double).entry();
        let p = program.function(double).params[0];
        let two = program.make_constant(Type::Integer(32), 2);
        let mul = program.push_back(double_entry, Instruction::BinaryOp { op: BinaryOpKind::Mul, lhs: p, rhs: two });
        let doubled = program.inst_result(mul).unwrap();
        program.set_terminator(double_entry, Terminator::Return { value: Some(doubled) });

        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let five = program.make_constant(Type::Integer(32), 5);
        let double_value = program.function(double).value;
        let call = program.push_back(entry, Instruction::Call { callee: double_value, args: vec![five] });
        let call_result = program.inst_result(call).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(call_result) });

        let mut ctx = Context::new(&mut program);
        let changed = Inlining.run_on_function(&mut ctx, f).unwrap();
        assert!(changed);
        assert!(!ctx.program().block(entry).insts().iter().any(|&i| ctx.program().inst(i).data.is_call()));
        assert!(ctx.program().block(entry).insts().iter().any(|&i| matches!(
            ctx.program().inst(i).data,
            Instruction::BinaryOp { op: BinaryOpKind::Mul, .. }
        )));
    }

    #[test]
    fn refuses_to_inline_a_callee_that_itself_calls() {
        let mut program = Program::new();
        let leaf = program.declare_function("leaf", Signature::new(vec![], Type::Void));
        let leaf_entry = program.function(leaf).entry();
        program.set_terminator(leaf_entry, Terminator::Return { value: None });

        let middle = program.declare_function("middle", Signature::new(vec![], Type::Void));
        let middle_entry = program.function(middle).entry();
        let leaf_value = program.function(leaf).value;
        program.push_back(middle_entry, Instruction::Call { callee: leaf_value, args: vec![] });
        program.set_terminator(middle_entry, Terminator::Return { value: None });

        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let entry = program.function(f).entry();
        let middle_value = program.function(middle).value;
        program.push_back(entry, Instruction::Call { callee: middle_value, args: vec![] });
        program.set_terminator(entry, Terminator::Return { value: None });

        let mut ctx = Context::new(&mut program);
        let changed = Inlining.run_on_function(&mut ctx, f).unwrap();
        assert!(!changed);
    }
}
