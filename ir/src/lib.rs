pub mod block;
pub mod display;
pub mod entities;
pub mod error;
pub mod function;
pub mod instruction;
pub mod ops;
pub mod program;
pub mod terminator;
pub mod text;
pub mod types;
pub mod value;

pub use block::BlockData;
pub use display::{FunctionPrinter, NameEnv, ProgramPrinter};
pub use entities::{BasicBlock, Function, Inst, Value};
pub use error::IrError;
pub use function::{FunctionData, Signature};
pub use instruction::{InstData, Instruction};
pub use ops::{BinaryOpKind, UnaryOpKind};
pub use program::Program;
pub use terminator::Terminator;
pub use types::Type;
pub use value::{User, ValueKind, ValueNode};
