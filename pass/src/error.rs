use thiserror::Error;
use weft_analysis::VerifierError;
use weft_ir::IrError;

/// Errors a pass (or the driver running them) can report. Distinct from
/// [`IrError`], which is about misusing the graph-mutation primitives —
/// `PassError` is about a pass discovering the *program* is unsound or
/// untransformable, which is fatal for the current optimization run
/// — an internal pass error, not a user-facing diagnostic.
#[derive(Debug, Error)]
pub enum PassError {
    /// `alloc-to-phi` found a Phi with no reaching definition for some
    /// predecessor, and that Phi is actually used.
    #[error("undefined value: a live Phi has no reaching definition for one of its predecessors")]
    UndefinedValue,
    #[error("division or modulo by zero")]
    DivByZero,
    #[error("branch condition is not a bool")]
    BadBool,
    #[error(transparent)]
    VerifierFailed(#[from] VerifierError),
    #[error(transparent)]
    Ir(#[from] IrError),
}
