use rustc_hash::FxHashMap;

use weft_ir::{BasicBlock, Function, Inst, Instruction, Program, Terminator, Type, Value, ValueKind};

use crate::context::Context;
use crate::error::PassError;
use crate::passes::Pass;

/// Sparse Conditional Constant Propagation. Unlike [`super::constant_folding`],
/// which only folds an instruction whose *current* operands happen to be
/// constants, SCCP computes a meet-over-all-paths fixed point across Phis and
/// branch conditions together, so it also resolves values that only become
/// constant once an unreachable predecessor is excluded from the meet (optional
/// pass, gated by `OptimizerConfig::enable_sccp`).
#[derive(Default)]
pub struct Sccp;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Lattice {
    Top,
    Const(i64),
    Bottom,
}

impl Lattice {
    fn meet(self, other: Lattice) -> Lattice {
        match (self, other) {
            (Lattice::Top, x) | (x, Lattice::Top) => x,
            (Lattice::Const(a), Lattice::Const(b)) if a == b => Lattice::Const(a),
            _ => Lattice::Bottom,
        }
    }
}

impl Pass for Sccp {
    fn name(&self) -> &'static str {
        "sccp"
    }

    fn run_on_function(&mut self, ctx: &mut Context, function: Function) -> Result<bool, PassError> {
        let (executable, values) = solve(ctx.program(), function);

        let mut changed = false;
        for (&value, &lattice) in &values {
            if let Lattice::Const(c) = lattice {
                if let ValueKind::Instruction { inst, .. } = ctx.program().value(value).kind.clone() {
                    let ty = ctx.program().value(value).ty().clone();
                    let replacement = ctx.program_mut().make_constant(ty, c);
                    if replacement != value {
                        ctx.program_mut().replace_all_uses(value, replacement)?;
                        if ctx.program_mut().delete_deep(inst).is_ok() {
                            changed = true;
                        }
                    }
                }
            }
        }

        for &block in ctx.program().function(function).blocks() {
            if !executable.contains(&block) || !ctx.program().block(block).is_attached() {
                continue;
            }
            if fold_branch(ctx, function, block)? {
                changed = true;
            }
        }

        if changed {
            ctx.report_instr_changed();
        }
        Ok(changed)
    }
}

fn fold_branch(ctx: &mut Context, function: Function, block: BasicBlock) -> Result<bool, PassError> {
    let Some(Terminator::Branch { cond, if_true, if_false }) = ctx.program().block(block).terminator.clone() else {
        return Ok(false);
    };
    if let ValueKind::Constant { ty, value: c } = &ctx.program().value(cond).kind {
        if ty.is_bool() {
            if *c != 0 && *c != 1 {
                return Err(PassError::BadBool);
            }
            let target = if *c == 1 { if_true } else { if_false };
            ctx.program_mut().set_terminator(block, Terminator::Jump { target });
            ctx.report_graph_changed(function);
            return Ok(true);
        }
    }
    Ok(false)
}

/// Classic worklist SCCP: an optimistic `cfg_worklist`/`ssa_worklist` pair.
/// Blocks start unreachable except the entry; a value starts `Top` until
/// evidence pulls it down to a `Const` or all the way to `Bottom`.
fn solve(program: &Program, function: Function) -> (rustc_hash::FxHashSet<BasicBlock>, FxHashMap<Value, Lattice>) {
    let entry = program.function(function).entry();
    let mut executable = rustc_hash::FxHashSet::default();
    let mut values: FxHashMap<Value, Lattice> = FxHashMap::default();
    let mut cfg_worklist = vec![entry];
    let mut ssa_worklist: Vec<Value> = Vec::new();

    while !cfg_worklist.is_empty() || !ssa_worklist.is_empty() {
        while let Some(block) = cfg_worklist.pop() {
            if !executable.insert(block) {
                continue;
            }
            for &inst in program.block(block).insts() {
                evaluate(program, inst, &mut values, &mut ssa_worklist);
            }
            if let Some(Terminator::Branch { cond, if_true, if_false }) = &program.block(block).terminator {
                match lattice_of(program, &values, *cond) {
                    Lattice::Const(c) if c == 1 => cfg_worklist.push(program.block_as_value(*if_true)),
                    Lattice::Const(_) => cfg_worklist.push(program.block_as_value(*if_false)),
                    _ => {
                        cfg_worklist.push(program.block_as_value(*if_true));
                        cfg_worklist.push(program.block_as_value(*if_false));
                    }
                }
            } else if program.block(block).terminator.is_some() {
                for target in program.successors(block) {
                    cfg_worklist.push(target);
                }
            }
        }

        while let Some(value) = ssa_worklist.pop() {
            for &user in program.value(value).users() {
                if let weft_ir::User::Inst(inst) = user {
                    evaluate(program, inst, &mut values, &mut ssa_worklist);
                    if executable.contains(&program.inst(inst).block) {
                        continue;
                    }
                }
            }
        }
    }
    (executable, values)
}

fn lattice_of(program: &Program, values: &FxHashMap<Value, Lattice>, value: Value) -> Lattice {
    if let ValueKind::Constant { value: c, .. } = &program.value(value).kind {
        return Lattice::Const(*c);
    }
    values.get(&value).copied().unwrap_or(Lattice::Top)
}

fn evaluate(program: &Program, inst: Inst, values: &mut FxHashMap<Value, Lattice>, worklist: &mut Vec<Value>) {
    let Some(result) = program.inst_result(inst) else { return };
    let new = match &program.inst(inst).data {
        Instruction::BinaryOp { op, lhs, rhs } => {
            match (lattice_of(program, values, *lhs), lattice_of(program, values, *rhs)) {
                (Lattice::Const(a), Lattice::Const(b)) => {
                    let ty: Type = program.value(*lhs).ty().clone();
                    op.evaluate(&ty, a, b).map(Lattice::Const).unwrap_or(Lattice::Bottom)
                }
                (Lattice::Bottom, _) | (_, Lattice::Bottom) => Lattice::Bottom,
                _ => Lattice::Top,
            }
        }
        Instruction::UnaryOp { op, value } => match lattice_of(program, values, *value) {
            Lattice::Const(v) => Lattice::Const(op.evaluate(&program.value(*value).ty().clone(), v)),
            other => other,
        },
        Instruction::Phi { sources, .. } => sources
            .values()
            .map(|&v| lattice_of(program, values, v))
            .fold(Lattice::Top, Lattice::meet),
        _ => Lattice::Bottom,
    };
    let old = values.get(&result).copied().unwrap_or(Lattice::Top);
    let merged = old.meet(new);
    if merged != old {
        values.insert(result, merged);
        worklist.push(result);
    }
}
