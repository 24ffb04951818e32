use log::{debug, trace};
use rustc_hash::FxHashMap;

use weft_ir::{BasicBlock, Function, Inst, Instruction, Program, Terminator, Value, ValueKind};

use crate::trap::{Outcome, Snapshot, Trap, TrapKind};
use crate::value::RuntimeValue;

/// A deterministic, single-stepping reference evaluator over the IR. State
/// is a mapping from `Inst` to the `RuntimeValue` it produced, the block
/// currently executing, and the block execution most recently arrived from
/// (needed to resolve a `Phi`).
pub struct Interpreter<'p> {
    program: &'p Program,
    function: Function,
    values: FxHashMap<Inst, RuntimeValue>,
    params: FxHashMap<Value, RuntimeValue>,
    curr_block: BasicBlock,
    prev_block: Option<BasicBlock>,
    cursor: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, function: Function, args: Vec<RuntimeValue>) -> Self {
        let entry = program.function(function).entry();
        let mut params = FxHashMap::default();
        for (&param, arg) in program.function(function).params.iter().zip(args) {
            params.insert(param, arg);
        }
        Self {
            program,
            function,
            values: FxHashMap::default(),
            params,
            curr_block: entry,
            prev_block: None,
            cursor: 0,
        }
    }

    fn snapshot(&self, inst: Option<Inst>) -> Snapshot {
        Snapshot { block: self.curr_block, inst, prev_block: self.prev_block }
    }

    fn resolve(&self, value: Value) -> Result<RuntimeValue, TrapKind> {
        match &self.program.value(value).kind {
            ValueKind::Constant { ty, value } => Ok(RuntimeValue::integer(ty, *value)),
            ValueKind::Parameter { .. } => Ok(self.params[&value].clone()),
            ValueKind::Instruction { inst, .. } => Ok(self.values[inst].clone()),
            ValueKind::Undef(_) => Err(TrapKind::UseOfUninitialized),
            ValueKind::FunctionRef(_) | ValueKind::BlockRef(_) => Ok(RuntimeValue::Void),
        }
    }

    /// Runs to completion: repeatedly steps until the function returns,
    /// exits, or traps.
    pub fn run(&mut self) -> Outcome {
        loop {
            if let Some(outcome) = self.step() {
                return outcome;
            }
        }
    }

    /// Advances by one IR position. Returns `None` while still running,
    /// `Some(outcome)` once the function has returned, exited, or trapped.
    pub fn step(&mut self) -> Option<Outcome> {
        let insts = self.program.block(self.curr_block).insts();
        if self.cursor < insts.len() {
            let inst = insts[self.cursor];
            trace!("interp: step {}/{}", self.curr_block, inst);
            match self.execute(inst) {
                Ok(()) => {
                    self.cursor += 1;
                    None
                }
                Err(kind) => Some(Outcome::Trapped(Trap { kind, snapshot: self.snapshot(Some(inst)) })),
            }
        } else {
            self.execute_terminator()
        }
    }

    fn execute(&mut self, inst: Inst) -> Result<(), TrapKind> {
        let data = self.program.inst(inst).data.clone();
        match data {
            Instruction::Alloc { inner } => {
                self.values.insert(inst, RuntimeValue::fresh_box(inner));
            }
            Instruction::Store { ptr, value } => {
                let ptr = self.resolve(ptr)?;
                let value = self.resolve(value)?;
                let cell = ptr.as_box().expect("verified: store's first operand is a pointer");
                *cell.borrow_mut() = Some(value);
            }
            Instruction::Load { ptr } => {
                let ptr = self.resolve(ptr)?;
                let cell = ptr.as_box().expect("verified: load's operand is a pointer");
                let loaded = cell.borrow().clone().ok_or(TrapKind::UseOfUninitialized)?;
                self.values.insert(inst, loaded);
            }
            Instruction::BinaryOp { op, lhs, rhs } => {
                let lhs_value = self.resolve(lhs)?;
                let rhs_value = self.resolve(rhs)?;
                let ty = self.program.value(lhs).ty().clone();
                let a = lhs_value.as_integer().expect("verified: binop operands are integers");
                let b = rhs_value.as_integer().expect("verified: binop operands are integers");
                let result = op.evaluate(&ty, a, b).map_err(|_| TrapKind::DivByZero)?;
                let result_ty = op.result_type(&ty);
                self.values.insert(inst, RuntimeValue::integer(&result_ty, result));
            }
            Instruction::UnaryOp { op, value } => {
                let operand = self.resolve(value)?;
                let ty = self.program.value(value).ty().clone();
                let a = operand.as_integer().expect("verified: unop operand is an integer");
                let result = op.evaluate(&ty, a);
                self.values.insert(inst, RuntimeValue::integer(&ty, result));
            }
            Instruction::Phi { sources, .. } => {
                let prev = self.prev_block.ok_or(TrapKind::UnreachedPredecessor)?;
                let source = sources.get(&prev).copied().ok_or(TrapKind::UnreachedPredecessor)?;
                let resolved = self.resolve(source)?;
                self.values.insert(inst, resolved);
            }
            Instruction::Call { callee, args } => {
                let ValueKind::FunctionRef(callee_fn) = self.program.value(callee).kind.clone() else {
                    unreachable!("verified: call's callee operand is a function reference");
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.resolve(arg)?);
                }
                let mut callee_interp = Interpreter::new(self.program, callee_fn, arg_values);
                match callee_interp.run() {
                    Outcome::Returned(value) => {
                        self.values.insert(inst, value);
                    }
                    Outcome::Trapped(trap) => return Err(trap.kind),
                }
            }
        }
        Ok(())
    }

    /// Executes the current block's terminator. `Branch`/`Jump` only move
    /// the cursor and report `None` (still running); `Return`/`Exit` and
    /// traps are the only ways this yields `Some`.
    fn execute_terminator(&mut self) -> Option<Outcome> {
        let terminator = self.program.block(self.curr_block).terminator.clone().expect("verified: every block has a terminator");
        match terminator {
            Terminator::Branch { cond, if_true, if_false } => match self.resolve(cond) {
                Ok(value) => match value.as_integer() {
                    Some(0) => {
                        self.jump_to(self.program.block_as_value(if_false));
                        None
                    }
                    Some(1) => {
                        self.jump_to(self.program.block_as_value(if_true));
                        None
                    }
                    _ => Some(Outcome::Trapped(Trap { kind: TrapKind::BadBool, snapshot: self.snapshot(None) })),
                },
                Err(kind) => Some(Outcome::Trapped(Trap { kind, snapshot: self.snapshot(None) })),
            },
            Terminator::Jump { target } => {
                self.jump_to(self.program.block_as_value(target));
                None
            }
            Terminator::Return { value } => {
                let resolved = match value {
                    Some(v) => match self.resolve(v) {
                        Ok(rv) => rv,
                        Err(kind) => return Some(Outcome::Trapped(Trap { kind, snapshot: self.snapshot(None) })),
                    },
                    None => RuntimeValue::Void,
                };
                debug!("interp: {} returns", self.program.function(self.function).name);
                Some(Outcome::Returned(resolved))
            }
            Terminator::Exit => {
                debug!("interp: {} exits", self.program.function(self.function).name);
                Some(Outcome::Returned(RuntimeValue::Void))
            }
        }
    }

    fn jump_to(&mut self, target: BasicBlock) {
        self.prev_block = Some(self.curr_block);
        self.curr_block = target;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{BinaryOpKind, Program, Signature, Type};

    #[test]
    fn returns_a_constant_sum() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let two = program.make_constant(Type::Integer(32), 2);
        let three = program.make_constant(Type::Integer(32), 3);
        let add = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: two, rhs: three });
        let result = program.inst_result(add).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(result) });

        let mut interp = Interpreter::new(&program, f, vec![]);
        match interp.run() {
            Outcome::Returned(v) => assert_eq!(v.as_integer(), Some(5)),
            Outcome::Trapped(t) => panic!("unexpected trap: {t:?}"),
        }
    }

    #[test]
    fn traps_on_division_by_zero() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let one = program.make_constant(Type::Integer(32), 1);
        let zero = program.make_constant(Type::Integer(32), 0);
        let div = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Div, lhs: one, rhs: zero });
        let result = program.inst_result(div).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(result) });

        let mut interp = Interpreter::new(&program, f, vec![]);
        match interp.run() {
            Outcome::Trapped(t) => assert_eq!(t.kind, TrapKind::DivByZero),
            Outcome::Returned(v) => panic!("expected a trap, got {v:?}"),
        }
    }

    #[test]
    fn resolves_phi_from_the_taken_branch() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![Type::bool()], Type::Integer(32)));
        let entry = program.function(f).entry();
        let then_block = program.create_block(f);
        let else_block = program.create_block(f);
        let join = program.create_block(f);

        let cond = program.function(f).params[0];
        let then_value = program.block(then_block).value;
        let else_value = program.block(else_block).value;
        program.set_terminator(entry, Terminator::Branch { cond, if_true: then_value, if_false: else_value });

        let one = program.make_constant(Type::Integer(32), 1);
        let join_value = program.block(join).value;
        program.set_terminator(then_block, Terminator::Jump { target: join_value });
        let two = program.make_constant(Type::Integer(32), 2);
        program.set_terminator(else_block, Terminator::Jump { target: join_value });

        let mut sources = std::collections::BTreeMap::new();
        sources.insert(then_block, one);
        sources.insert(else_block, two);
        let phi = program.push_back(join, Instruction::Phi { ty: Type::Integer(32), sources });
        let phi_value = program.inst_result(phi).unwrap();
        program.set_terminator(join, Terminator::Return { value: Some(phi_value) });

        let mut interp = Interpreter::new(&program, f, vec![RuntimeValue::integer(&Type::bool(), 1)]);
        match interp.run() {
            Outcome::Returned(v) => assert_eq!(v.as_integer(), Some(1)),
            Outcome::Trapped(t) => panic!("unexpected trap: {t:?}"),
        }
    }
}
