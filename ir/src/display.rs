use std::cell::RefCell;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::entities::{Function, Value};
use crate::instruction::Instruction;
use crate::program::Program;
use crate::terminator::Terminator;
use crate::value::ValueKind;

/// Assigns stable, human-readable names to `Value`s within a single
/// function's print session: names are a scoped environment supplied at
/// print time, not stored on the nodes themselves.
///
/// Names are assigned lazily on first mention and memoized for the lifetime
/// of the `NameEnv`, so that repeated mentions of the same value within one
/// snapshot always print identically.
pub struct NameEnv {
    names: RefCell<FxHashMap<Value, String>>,
    next: RefCell<u32>,
}

impl NameEnv {
    pub fn new() -> Self {
        Self { names: RefCell::new(FxHashMap::default()), next: RefCell::new(0) }
    }

    fn fresh(&self) -> String {
        let mut next = self.next.borrow_mut();
        let name = format!("%{next}");
        *next += 1;
        name
    }

    pub fn name_of(&self, program: &Program, value: Value) -> String {
        if let Some(existing) = self.names.borrow().get(&value) {
            return existing.clone();
        }
        let name = match &program.value(value).kind {
            ValueKind::Parameter { function, index, .. } => {
                let _ = function;
                format!("%p{index}")
            }
            _ => self.fresh(),
        };
        self.names.borrow_mut().insert(value, name.clone());
        name
    }
}

impl Default for NameEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders an operand: a named value reference, except for constants and
/// `undef`, which print as literals directly in operand position (matching
/// the textual grammar's `<n> i<width>` for integer constants).
fn fmt_operand(program: &Program, names: &NameEnv, value: Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &program.value(value).kind {
        ValueKind::Constant { ty, value } => write!(f, "{value} {ty}"),
        ValueKind::Undef(ty) => write!(f, "undef {ty}"),
        ValueKind::FunctionRef(function) => write!(f, "@{}", program.function(*function).name),
        ValueKind::BlockRef(block) => write!(f, "{block}"),
        ValueKind::Parameter { .. } | ValueKind::Instruction { .. } => {
            write!(f, "{}", names.name_of(program, value))
        }
    }
}

struct OperandList<'a>(&'a Program, &'a NameEnv, &'a [Value]);
impl fmt::Display for OperandList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &v) in self.2.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            fmt_operand(self.0, self.1, v, f)?;
        }
        Ok(())
    }
}

fn fmt_instruction(
    program: &Program,
    names: &NameEnv,
    result: Option<Value>,
    data: &Instruction,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    if let Some(result) = result {
        write!(f, "{} = ", names.name_of(program, result))?;
    }
    match data {
        Instruction::Alloc { inner } => write!(f, "alloc {inner}"),
        Instruction::Store { ptr, value } => {
            write!(f, "store ")?;
            fmt_operand(program, names, *ptr, f)?;
            write!(f, ", ")?;
            fmt_operand(program, names, *value, f)
        }
        Instruction::Load { ptr } => {
            write!(f, "load ")?;
            fmt_operand(program, names, *ptr, f)
        }
        Instruction::BinaryOp { op, lhs, rhs } => {
            write!(f, "{op} ")?;
            fmt_operand(program, names, *lhs, f)?;
            write!(f, ", ")?;
            fmt_operand(program, names, *rhs, f)
        }
        Instruction::UnaryOp { op, value } => {
            write!(f, "{op} ")?;
            fmt_operand(program, names, *value, f)
        }
        Instruction::Phi { sources, .. } => {
            write!(f, "phi")?;
            for (i, (block, value)) in sources.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " [{block}: ")?;
                fmt_operand(program, names, *value, f)?;
                write!(f, "]")?;
            }
            Ok(())
        }
        Instruction::Call { callee, args } => {
            write!(f, "call ")?;
            fmt_operand(program, names, *callee, f)?;
            write!(f, "({})", OperandList(program, names, args))
        }
    }
}

fn fmt_terminator(program: &Program, names: &NameEnv, term: &Terminator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match term {
        Terminator::Branch { cond, if_true, if_false } => {
            write!(f, "branch ")?;
            fmt_operand(program, names, *cond, f)?;
            write!(f, ", ")?;
            fmt_operand(program, names, *if_true, f)?;
            write!(f, ", ")?;
            fmt_operand(program, names, *if_false, f)
        }
        Terminator::Jump { target } => {
            write!(f, "jump ")?;
            fmt_operand(program, names, *target, f)
        }
        Terminator::Return { value: Some(v) } => {
            write!(f, "return ")?;
            fmt_operand(program, names, *v, f)
        }
        Terminator::Return { value: None } => write!(f, "return"),
        Terminator::Exit => write!(f, "exit"),
    }
}

pub struct FunctionPrinter<'a> {
    program: &'a Program,
    function: Function,
}

impl<'a> FunctionPrinter<'a> {
    pub fn new(program: &'a Program, function: Function) -> Self {
        Self { program, function }
    }
}

impl fmt::Display for FunctionPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program;
        let names = NameEnv::new();
        let data = program.function(self.function);
        write!(f, "fun @{}(", data.name)?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", names.name_of(program, param), program.value_type(param))?;
        }
        writeln!(f, ") : {} {{", data.signature.ret)?;
        for &block in data.blocks() {
            if !program.block(block).is_attached() {
                continue;
            }
            writeln!(f, "  {block}:")?;
            for &inst in program.block(block).insts() {
                write!(f, "    ")?;
                let inst_data = program.inst(inst);
                fmt_instruction(program, &names, inst_data.result, &inst_data.data, f)?;
                writeln!(f)?;
            }
            if let Some(term) = &program.block(block).terminator {
                write!(f, "    ")?;
                fmt_terminator(program, &names, term, f)?;
                writeln!(f)?;
            }
        }
        write!(f, "}}")
    }
}

pub struct ProgramPrinter<'a> {
    program: &'a Program,
}

impl<'a> ProgramPrinter<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }
}

impl fmt::Display for ProgramPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.program.functions().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", FunctionPrinter::new(self.program, function))?;
        }
        Ok(())
    }
}
