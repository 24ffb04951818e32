use cranelift_entity::entity_impl;

/// A handle to a [`crate::value::ValueNode`]. Every def/use-able thing in the
/// IR — constants, parameters, function references, block references,
/// instruction results, and `undef`s — is addressed through this single
/// handle space: every value carries a type and a set of users regardless
/// of which kind it is.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A handle to an [`crate::instruction::InstData`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A handle to a [`crate::block::BlockData`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BasicBlock(u32);
entity_impl!(BasicBlock, "block");

/// A handle to a [`crate::function::FunctionData`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Function(u32);
entity_impl!(Function, "fn");
