use smallvec::SmallVec;

use crate::entities::{BasicBlock, Value};
use crate::value::ValueKind;

/// A block terminator.
///
/// `Branch`/`Jump` targets are held as [`Value`]s wrapping [`ValueKind::BlockRef`]
/// rather than bare `BasicBlock` handles, so that `replaceAllUses` can rewire
/// a CFG edge the same way it rewrites any other operand — this is what lets
/// `SimplifyBlocks`' empty-block collapse reuse the generic mutation
/// primitive instead of a bespoke "patch predecessors" routine.
#[derive(Debug, Clone)]
pub enum Terminator {
    Branch { cond: Value, if_true: Value, if_false: Value },
    Jump { target: Value },
    Return { value: Option<Value> },
    Exit,
}

impl Terminator {
    pub fn operands(&self) -> SmallVec<[Value; 3]> {
        match self {
            Terminator::Branch { cond, if_true, if_false } => {
                SmallVec::from_slice(&[*cond, *if_true, *if_false])
            }
            Terminator::Jump { target } => SmallVec::from_slice(&[*target]),
            Terminator::Return { value: Some(v) } => SmallVec::from_slice(&[*v]),
            Terminator::Return { value: None } => SmallVec::new(),
            Terminator::Exit => SmallVec::new(),
        }
    }

    pub fn operands_mut(&mut self) -> SmallVec<[&mut Value; 3]> {
        match self {
            Terminator::Branch { cond, if_true, if_false } => {
                smallvec::smallvec![cond, if_true, if_false]
            }
            Terminator::Jump { target } => smallvec::smallvec![target],
            Terminator::Return { value: Some(v) } => smallvec::smallvec![v],
            Terminator::Return { value: None } => SmallVec::new(),
            Terminator::Exit => SmallVec::new(),
        }
    }

    /// Unwraps the `BlockRef` operands that name this terminator's successor
    /// blocks, in a stable order (for `Branch`: `[if_true, if_false]`).
    pub fn target_blocks(&self, resolve: impl Fn(Value) -> BasicBlock) -> SmallVec<[BasicBlock; 2]> {
        match self {
            Terminator::Branch { if_true, if_false, .. } => {
                SmallVec::from_slice(&[resolve(*if_true), resolve(*if_false)])
            }
            Terminator::Jump { target } => SmallVec::from_slice(&[resolve(*target)]),
            Terminator::Return { .. } | Terminator::Exit => SmallVec::new(),
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Terminator::Branch { .. })
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Terminator::Jump { .. })
    }
}

/// Extracts the `BasicBlock` a `BlockRef` value wraps; panics if `value` is
/// not a block reference, which would indicate a malformed terminator.
pub fn expect_block_ref(kind: &ValueKind) -> BasicBlock {
    match kind {
        ValueKind::BlockRef(b) => *b,
        other => panic!("expected a block reference operand, found {other:?}"),
    }
}
