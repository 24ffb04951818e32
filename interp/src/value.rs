use std::cell::RefCell;
use std::rc::Rc;

use weft_ir::Type;

/// A runtime value, tagged by kind: an integer of a
/// declared width, a heap cell produced by `alloc` (shared so `Store`
/// through one copy of the pointer is visible through another), or `Void`
/// (the result of an impure instruction/terminator with no value).
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    Integer { width: u32, value: i64 },
    Box { inner: Type, cell: Rc<RefCell<Option<RuntimeValue>>> },
    Void,
}

impl RuntimeValue {
    pub fn integer(ty: &Type, value: i64) -> Self {
        RuntimeValue::Integer { width: ty.bit_width(), value: ty.wrap(value) }
    }

    pub fn fresh_box(inner: Type) -> Self {
        RuntimeValue::Box { inner, cell: Rc::new(RefCell::new(None)) }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RuntimeValue::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<&Rc<RefCell<Option<RuntimeValue>>>> {
        match self {
            RuntimeValue::Box { cell, .. } => Some(cell),
            _ => None,
        }
    }
}
