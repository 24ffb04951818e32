use std::fmt;

use rustc_hash::FxHashSet;
use thiserror::Error;

use weft_ir::{BasicBlock, Function, Inst, Instruction, Program, Terminator, Value};

use crate::dominator::DominatorInfo;

/// A single verification failure, carrying enough context (function name,
/// block, instruction index) for a caller to report it without re-walking
/// the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub function: String,
    pub block: Option<BasicBlock>,
    pub inst_index: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in @{}", self.function)?;
        if let Some(block) = self.block {
            write!(f, ", {block}")?;
        }
        if let Some(index) = self.inst_index {
            write!(f, " (instruction {index})")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("verification failed with {} diagnostic(s): {}", .0.len(), render(.0))]
pub struct VerifierError(pub Vec<Diagnostic>);

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("; ")
}

/// Runs every structural and dominance check against the whole program,
/// accumulating diagnostics rather than stopping at the first failure so a
/// caller sees the full picture of what is wrong.
pub fn verify(program: &Program) -> Result<(), VerifierError> {
    let mut diagnostics = Vec::new();
    for function in program.functions() {
        verify_function(program, function, &mut diagnostics);
    }
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(VerifierError(diagnostics))
    }
}

fn verify_function(program: &Program, function: Function, out: &mut Vec<Diagnostic>) {
    let name = program.function(function).name.clone();
    let entry = program.function(function).entry();
    let dom = DominatorInfo::compute(program, function);
    let reachable: FxHashSet<BasicBlock> = program
        .function(function)
        .blocks()
        .iter()
        .copied()
        .filter(|&b| program.block(b).is_attached() && dom.dominators(b).contains(&entry))
        .collect();

    for &block in program.function(function).blocks() {
        if !program.block(block).is_attached() {
            continue;
        }
        if block != entry && !reachable.contains(&block) {
            out.push(Diagnostic {
                function: name.clone(),
                block: Some(block),
                inst_index: None,
                message: "block is not reachable from the function's entry".to_string(),
            });
        }
        if block == entry && !program.predecessors(function, entry).is_empty() {
            out.push(Diagnostic {
                function: name.clone(),
                block: Some(block),
                inst_index: None,
                message: "entry block has predecessors".to_string(),
            });
        }

        let preds: FxHashSet<BasicBlock> = program.predecessors(function, block).into_iter().collect();
        for (index, &inst) in program.block(block).insts().iter().enumerate() {
            verify_instruction(program, &name, block, index, inst, &preds, out);
        }
        verify_terminator(program, &name, block, out);
    }
}

fn verify_instruction(
    program: &Program,
    function: &str,
    block: BasicBlock,
    index: usize,
    inst: Inst,
    preds: &FxHashSet<BasicBlock>,
    out: &mut Vec<Diagnostic>,
) {
    let data = &program.inst(inst).data;
    let mut fail = |message: String| {
        out.push(Diagnostic { function: function.to_string(), block: Some(block), inst_index: Some(index), message })
    };

    for &operand in &data.operands() {
        verify_value(program, operand, &mut fail);
        verify_reciprocal_use(program, operand, weft_ir::User::Inst(inst), &mut fail);
    }

    match data {
        Instruction::Store { ptr, value } => {
            let ptr_ty = program.value_type(*ptr);
            match ptr_ty.pointee() {
                Some(pointee) if pointee == program.value_type(*value) => {}
                Some(_) => fail("stored value type does not match the pointee type".to_string()),
                None => fail("store target is not a pointer".to_string()),
            }
        }
        Instruction::Load { ptr } => {
            if !program.value_type(*ptr).is_pointer() {
                fail("load target is not a pointer".to_string());
            }
        }
        Instruction::BinaryOp { lhs, rhs, .. } => {
            if program.value_type(*lhs) != program.value_type(*rhs) {
                fail("binary operands have mismatched types".to_string());
            }
        }
        Instruction::Phi { sources, .. } => {
            let got: FxHashSet<BasicBlock> = sources.keys().copied().collect();
            if &got != preds {
                fail(format!(
                    "phi sources {got:?} do not match the block's predecessor set {preds:?}",
                ));
            }
        }
        Instruction::Call { callee, args } => match &program.value(*callee).kind {
            weft_ir::ValueKind::FunctionRef(target) => {
                let sig = &program.function(*target).signature;
                if sig.params.len() != args.len() {
                    fail("call argument count does not match callee signature".to_string());
                } else {
                    for (param_ty, &arg) in sig.params.iter().zip(args) {
                        if program.value_type(arg) != param_ty {
                            fail("call argument type does not match callee signature".to_string());
                        }
                    }
                }
            }
            _ => fail("call target is not a function reference".to_string()),
        },
        Instruction::Alloc { .. } | Instruction::UnaryOp { .. } => {}
    }
}

fn verify_terminator(program: &Program, function: &str, block: BasicBlock, out: &mut Vec<Diagnostic>) {
    let mut fail = |message: String| {
        out.push(Diagnostic { function: function.to_string(), block: Some(block), inst_index: None, message })
    };
    let Some(term) = &program.block(block).terminator else {
        fail("block has no terminator".to_string());
        return;
    };
    for &operand in &term.operands() {
        verify_value(program, operand, &mut fail);
        verify_reciprocal_use(program, operand, weft_ir::User::Terminator(block), &mut fail);
    }
    if let Terminator::Branch { cond, .. } = term {
        if !program.value_type(*cond).is_bool() {
            fail("branch condition is not a bool".to_string());
        }
    }
}

fn verify_value(program: &Program, value: Value, fail: &mut impl FnMut(String)) {
    if let weft_ir::ValueKind::Constant { ty, value: literal } = &program.value(value).kind {
        if !ty.is_integer() {
            fail(format!("constant {value} has non-integer type {ty}"));
        } else if !ty.fits(*literal) {
            fail(format!("constant {value} = {literal} does not fit in {ty}"));
        }
    }
}

fn verify_reciprocal_use(program: &Program, value: Value, user: weft_ir::User, fail: &mut impl FnMut(String)) {
    if !program.value(value).users().contains(&user) {
        fail(format!("{value} is used but not reciprocally registered as a user"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Signature, Type};

    #[test]
    fn accepts_a_trivial_valid_function() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let five = program.make_constant(Type::Integer(32), 5);
        program.set_terminator(entry, Terminator::Return { value: Some(five) });
        assert!(verify(&program).is_ok());
    }

    #[test]
    fn rejects_an_out_of_range_constant() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(8)));
        let entry = program.function(f).entry();
        let huge = program.make_constant(Type::Integer(8), 1000);
        program.set_terminator(entry, Terminator::Return { value: Some(huge) });
        let err = verify(&program).unwrap_err();
        assert!(err.0.iter().any(|d| d.message.contains("does not fit")));
    }

    #[test]
    fn rejects_a_missing_terminator() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let _ = f;
        let err = verify(&program).unwrap_err();
        assert!(err.0.iter().any(|d| d.message.contains("no terminator")));
    }
}
