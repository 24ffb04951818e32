pub mod context;
pub mod error;
pub mod passes;

use log::{debug, info};

use weft_ir::{Function, Program};

pub use context::Context;
pub use error::PassError;
pub use passes::alloc_to_phi;
pub use passes::dce::Dce;
pub use passes::dead_block_elimination::DeadBlockElimination;
pub use passes::dead_instruction_elimination::DeadInstructionElimination;
pub use passes::dse::Dse;
pub use passes::constant_folding::ConstantFolding;
pub use passes::inlining::Inlining;
pub use passes::sccp::Sccp;
pub use passes::simplify_blocks::SimplifyBlocks;
pub use passes::Pass;

/// Enable-flags for the optional passes, plus
/// whether the driver re-verifies the program between rounds. The four
/// required passes (`ConstantFolding`, `DeadInstructionElimination`,
/// `SimplifyBlocks`, `DeadBlockElimination`) always run; `AllocToPhi` always
/// runs once, up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizerConfig {
    pub enable_sccp: bool,
    pub enable_dce: bool,
    pub enable_dse: bool,
    pub enable_inlining: bool,
    pub verify_between_passes: bool,
}

impl OptimizerConfig {
    pub fn all_enabled() -> Self {
        Self { enable_sccp: true, enable_dce: true, enable_dse: true, enable_inlining: true, verify_between_passes: false }
    }
}

/// Runs `AllocToPhi` once per function, then drives the configured pass
/// sequence to a fixed point: `Inlining → Sccp → ConstantFolding →
/// DeadInstructionElimination → Dce → Dse → SimplifyBlocks →
/// DeadBlockElimination`, looping while any pass reports a change.
/// Optional passes are skipped
/// entirely when their flag is off.
pub fn optimize(program: &mut Program, config: &OptimizerConfig) -> Result<(), PassError> {
    let functions: Vec<Function> = program.functions().collect();
    for function in functions {
        optimize_function(program, function, config)?;
    }
    Ok(())
}

fn optimize_function(program: &mut Program, function: Function, config: &OptimizerConfig) -> Result<(), PassError> {
    alloc_to_phi::run(program, function)?;

    let mut rounds = 0u32;
    loop {
        let mut ctx = Context::new(program);
        let mut changed = false;

        if config.enable_inlining {
            changed |= Inlining.run_on_function(&mut ctx, function)?;
        }
        if config.enable_sccp {
            changed |= Sccp.run_on_function(&mut ctx, function)?;
        }
        changed |= ConstantFolding.run_on_function(&mut ctx, function)?;
        changed |= DeadInstructionElimination.run_on_function(&mut ctx, function)?;
        if config.enable_dce {
            changed |= Dce.run_on_function(&mut ctx, function)?;
        }
        if config.enable_dse {
            changed |= Dse.run_on_function(&mut ctx, function)?;
        }
        changed |= SimplifyBlocks.run_on_function(&mut ctx, function)?;
        changed |= DeadBlockElimination.run_on_function(&mut ctx, function)?;

        ctx.take_changed();
        rounds += 1;

        if config.verify_between_passes {
            weft_analysis::verify(program)?;
        }

        if !changed {
            debug!("optimizer reached a fixed point for one function after {rounds} round(s)");
            break;
        }
    }
    info!("optimize(): {rounds} round(s) over one function");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{BinaryOpKind, Instruction, Signature, Terminator, Type};

    #[test]
    fn reaches_a_fixed_point_and_folds_a_constant_add() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let two = program.make_constant(Type::Integer(32), 2);
        let three = program.make_constant(Type::Integer(32), 3);
        let add = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: two, rhs: three });
        let result = program.inst_result(add).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(result) });

        optimize(&mut program, &OptimizerConfig::default()).unwrap();
        assert!(program.block(entry).insts().is_empty());
    }
}
