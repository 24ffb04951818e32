pub mod interpreter;
pub mod trap;
pub mod value;

pub use interpreter::Interpreter;
pub use trap::{Outcome, Snapshot, Trap, TrapKind};
pub use value::RuntimeValue;
