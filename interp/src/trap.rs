use thiserror::Error;

use weft_ir::{BasicBlock, Inst};

use crate::value::RuntimeValue;

/// Reasons an interpreted program can fail to produce a value; also reused
/// by constant folding when it must refuse to fold rather than silently
/// miscompile.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrapKind {
    #[error("division or modulo by zero")]
    DivByZero,
    #[error("branch condition is not 0 or 1")]
    BadBool,
    #[error("load of an uninitialized cell")]
    UseOfUninitialized,
    #[error("phi has no source for the block actually entered from")]
    UnreachedPredecessor,
}

/// A point-in-time view of interpreter state, captured at a trap or at
/// completion: which block and instruction were executing, and which block
/// control flow arrived from (needed to resolve a `Phi`).
#[derive(Clone)]
pub struct Snapshot {
    pub block: BasicBlock,
    pub inst: Option<Inst>,
    pub prev_block: Option<BasicBlock>,
}

#[derive(Debug, Error)]
#[error("trap: {kind} at {snapshot:?}")]
pub struct Trap {
    pub kind: TrapKind,
    pub snapshot: Snapshot,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.block)?;
        if let Some(inst) = self.inst {
            write!(f, "/{inst}")?;
        }
        Ok(())
    }
}

/// The outcome of running an [`crate::interpreter::Interpreter`] to
/// completion: a return value, or a trap.
#[derive(Debug)]
pub enum Outcome {
    Returned(RuntimeValue),
    Trapped(Trap),
}
