use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::entities::{BasicBlock, Inst, Value};
use crate::ops::{BinaryOpKind, UnaryOpKind};
use crate::types::Type;

/// A non-terminator instruction.
///
/// `Phi`'s sources are kept in a `BTreeMap` rather than a hash map so that
/// printing and verification iterate
/// predecessors in a stable order (matters for textual-IR round trips and
/// for deterministic diagnostics).
#[derive(Debug, Clone)]
pub enum Instruction {
    Alloc { inner: Type },
    Store { ptr: Value, value: Value },
    Load { ptr: Value },
    BinaryOp { op: BinaryOpKind, lhs: Value, rhs: Value },
    UnaryOp { op: UnaryOpKind, value: Value },
    Phi { ty: Type, sources: BTreeMap<BasicBlock, Value> },
    Call { callee: Value, args: Vec<Value> },
}

impl Instruction {
    /// The instruction's non-target operands, in a stable order. Phi
    /// operands are ordered by predecessor block for determinism.
    pub fn operands(&self) -> SmallVec<[Value; 4]> {
        match self {
            Instruction::Alloc { .. } => SmallVec::new(),
            Instruction::Store { ptr, value } => SmallVec::from_slice(&[*ptr, *value]),
            Instruction::Load { ptr } => SmallVec::from_slice(&[*ptr]),
            Instruction::BinaryOp { lhs, rhs, .. } => SmallVec::from_slice(&[*lhs, *rhs]),
            Instruction::UnaryOp { value, .. } => SmallVec::from_slice(&[*value]),
            Instruction::Phi { sources, .. } => sources.values().copied().collect(),
            Instruction::Call { callee, args } => {
                let mut operands = SmallVec::with_capacity(args.len() + 1);
                operands.push(*callee);
                operands.extend(args.iter().copied());
                operands
            }
        }
    }

    /// Mutable access to every operand slot, used by `replace_operand` and
    /// `replace_all_uses`.
    pub fn operands_mut(&mut self) -> SmallVec<[&mut Value; 4]> {
        match self {
            Instruction::Alloc { .. } => SmallVec::new(),
            Instruction::Store { ptr, value } => smallvec::smallvec![ptr, value],
            Instruction::Load { ptr } => smallvec::smallvec![ptr],
            Instruction::BinaryOp { lhs, rhs, .. } => smallvec::smallvec![lhs, rhs],
            Instruction::UnaryOp { value, .. } => smallvec::smallvec![value],
            Instruction::Phi { sources, .. } => sources.values_mut().collect(),
            Instruction::Call { callee, args } => {
                let mut operands: SmallVec<[&mut Value; 4]> = SmallVec::new();
                operands.push(callee);
                operands.extend(args.iter_mut());
                operands
            }
        }
    }

    /// True if this instruction produces a (non-`Void`) SSA value.
    pub fn has_result(&self) -> bool {
        !matches!(self, Instruction::Store { .. })
    }

    /// `Alloc`, `Load`, `BinaryOp`, `UnaryOp`, `Phi`, and pure `Call`s are
    /// pure; `Store` and impure `Call`s are not.
    /// Purity of a `Call` depends on whether the callee is known to be free
    /// of observable effects, which this instruction alone cannot answer —
    /// callers needing that distinction use
    /// [`crate::program::Program::is_pure_instruction`] instead, which has
    /// access to the callee's definition.
    pub fn is_pure_ignoring_calls(&self) -> bool {
        !matches!(self, Instruction::Store { .. } | Instruction::Call { .. })
    }

    pub fn is_alloc(&self) -> bool {
        matches!(self, Instruction::Alloc { .. })
    }

    pub fn is_load(&self) -> bool {
        matches!(self, Instruction::Load { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Instruction::Store { .. })
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Instruction::Phi { .. })
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Instruction::Call { .. })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Alloc { .. } => "alloc",
            Instruction::Store { .. } => "store",
            Instruction::Load { .. } => "load",
            Instruction::BinaryOp { .. } => "binop",
            Instruction::UnaryOp { .. } => "unop",
            Instruction::Phi { .. } => "phi",
            Instruction::Call { .. } => "call",
        }
    }
}

/// The metadata wrapped around an [`Instruction`]: which block it belongs
/// to, and the `Value` (if any) it produces. Separated from `Instruction`
/// itself so passes can pattern-match on the operator without threading
/// block/result bookkeeping through every arm.
#[derive(Debug, Clone)]
pub struct InstData {
    pub block: BasicBlock,
    pub data: Instruction,
    pub result: Option<Value>,
}

impl InstData {
    pub(crate) fn new(block: BasicBlock, data: Instruction) -> Self {
        Self { block, data, result: None }
    }
}
