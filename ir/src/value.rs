use rustc_hash::FxHashSet;

use crate::entities::{BasicBlock, Function, Inst};
use crate::types::Type;

/// Identifies the entity on the "use" side of an operand edge: either an
/// instruction operand slot, or the terminator of a block (terminators are
/// not themselves [`Inst`]s in this IR, so they need their own case here).
///
/// Use/def consistency requires that for every operand edge u -> v, u
/// appears in v's user set, where u is itself a value; in practice only
/// instructions and terminators hold operand slots, so `users` is keyed on
/// this enum rather than on `Value` directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum User {
    Inst(Inst),
    Terminator(BasicBlock),
}

/// The data behind a [`Value`] handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// An integer constant of the declared type. Not interned: distinct
    /// occurrences of the same literal are distinct `Value`s, matching how a
    /// naive AST-to-IR lowering would emit them.
    Constant { ty: Type, value: i64 },
    /// A function parameter.
    Parameter { ty: Type, function: Function, index: u32 },
    /// A reference to a [`Function`], usable as the callee operand of a
    /// `Call`.
    FunctionRef(Function),
    /// A reference to a [`BasicBlock`], usable as the target operand of a
    /// `Branch`/`Jump`. Making block references first-class `Value`s lets
    /// `replaceAllUses` double as "rewire this edge of the CFG", which is
    /// exactly what `SimplifyBlocks`' empty-block collapse needs.
    BlockRef(BasicBlock),
    /// The (sole) result of an instruction.
    Instruction { ty: Type, inst: Inst },
    /// An explicitly undefined value of the given type.
    Undef(Type),
}

/// A single node in the program-wide value pool: the payload plus the set of
/// users that currently hold it as an operand.
#[derive(Debug, Clone)]
pub struct ValueNode {
    pub kind: ValueKind,
    pub(crate) users: FxHashSet<User>,
    deleted: bool,
}

impl ValueNode {
    pub(crate) fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            users: FxHashSet::default(),
            deleted: false,
        }
    }

    /// The type of this value.
    pub fn ty(&self) -> &Type {
        self.assert_alive();
        match &self.kind {
            ValueKind::Constant { ty, .. } => ty,
            ValueKind::Parameter { ty, .. } => ty,
            ValueKind::FunctionRef(_) => &Type::Void,
            ValueKind::BlockRef(_) => &Type::Void,
            ValueKind::Instruction { ty, .. } => ty,
            ValueKind::Undef(ty) => ty,
        }
    }

    /// The set of [`User`]s currently holding this value as an operand.
    pub fn users(&self) -> &FxHashSet<User> {
        self.assert_alive();
        &self.users
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Panics when reading any field of a value that has been deleted.
    fn assert_alive(&self) {
        assert!(!self.deleted, "use of deleted value");
    }
}
