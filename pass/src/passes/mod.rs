pub mod alloc_to_phi;
pub mod constant_folding;
pub mod dce;
pub mod dead_block_elimination;
pub mod dead_instruction_elimination;
pub mod dse;
pub mod inlining;
pub mod sccp;
pub mod simplify_blocks;

use weft_ir::Function;

use crate::context::Context;
use crate::error::PassError;

/// A pass runs over one [`Function`] and reports whether it changed
/// anything, so the driver can decide whether another round is needed.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError>;
}
