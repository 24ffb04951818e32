/// Errors raised by the IR graph's mutation primitives.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum IrError {
    /// `replaceAllUses(old, new)` was asked to substitute a value of a
    /// different type.
    #[error("cannot replace uses of a {old} value with a {new} value")]
    TypeMismatch { old: crate::types::Type, new: crate::types::Type },

    /// `insertBefore`/`insertAfter`/`pushBack` was given an instruction that
    /// is already attached to a block.
    #[error("instruction is already attached to a block")]
    AlreadyParented,

    /// `remove` was asked to detach an instruction whose result still has
    /// users.
    #[error("instruction result still has users")]
    StillInUse,

    /// Integer division or modulo by zero; also reported by constant folding
    /// when it must refuse to fold.
    #[error("division or modulo by zero")]
    DivByZero,

    /// A lookup of an unknown identifier (function, block, or value) failed.
    #[error("not found: {0}")]
    NotFound(String),
}
