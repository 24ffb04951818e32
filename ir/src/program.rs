use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;

use crate::block::BlockData;
use crate::entities::{BasicBlock, Function, Inst, Value};
use crate::error::IrError;
use crate::function::{FunctionData, Signature};
use crate::instruction::{InstData, Instruction};
use crate::terminator::Terminator;
use crate::types::Type;
use crate::value::{User, ValueKind, ValueNode};

/// A [`Program`]: a named-entry `Function` plus the set
/// of `Function`s being compiled together.
///
/// Every `Value`, `Inst`, `BasicBlock`, and `Function` in the whole program
/// lives in one of the four arenas below, addressed by handle, scoped to the
/// whole `Program` rather than per-function — there is only ever one physical owner of IR
/// nodes, which keeps `replaceAllUses` and friends from needing to know
/// which function's graph an operand lives in.
#[derive(Debug, Default)]
pub struct Program {
    pub(crate) functions: PrimaryMap<Function, FunctionData>,
    pub(crate) blocks: PrimaryMap<BasicBlock, BlockData>,
    pub(crate) insts: PrimaryMap<Inst, InstData>,
    pub(crate) values: PrimaryMap<Value, ValueNode>,
    entry: Option<Function>,
    by_name: FxHashMap<String, Function>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- construction -----------------------------------------------

    /// Declares a new function with the given name and signature, creating
    /// its entry block and parameter values. Fails with `NotFound` only in
    /// the sense that callers are expected to check `contains` first; name
    /// collisions instead simply shadow the `by_name` lookup entry (the
    /// spec does not define module-level linking semantics).
    pub fn declare_function(&mut self, name: impl Into<String>, signature: Signature) -> Function {
        let name = name.into();
        let function = self.functions.next_key();
        let entry = self.blocks.next_key();
        let block_value = self.values.push(ValueNode::new(ValueKind::BlockRef(entry)));
        self.blocks.push(BlockData::new(function, block_value));
        let func_value = self.values.push(ValueNode::new(ValueKind::FunctionRef(function)));

        let mut data = FunctionData::new(name.clone(), signature.clone(), func_value, entry);
        for (index, ty) in signature.params.iter().enumerate() {
            let param = self.values.push(ValueNode::new(ValueKind::Parameter {
                ty: ty.clone(),
                function,
                index: index as u32,
            }));
            data.params.push(param);
        }
        let pushed = self.functions.push(data);
        debug_assert_eq!(pushed, function);
        self.by_name.insert(name, function);
        function
    }

    pub fn set_entrypoint(&mut self, function: Function) {
        self.entry = Some(function);
    }

    pub fn entrypoint(&self) -> Option<Function> {
        self.entry
    }

    pub fn function_by_name(&self, name: &str) -> Option<Function> {
        self.by_name.get(name).copied()
    }

    /// `function_by_name`, failing with `NotFound` instead of `None` — the
    /// lookup a `call`'s `@name` callee operand goes through when the
    /// textual IR is parsed.
    pub fn resolve_function(&self, name: &str) -> Result<Function, IrError> {
        self.function_by_name(name).ok_or_else(|| IrError::NotFound(format!("@{name}")))
    }

    pub fn create_block(&mut self, function: Function) -> BasicBlock {
        let block = self.blocks.next_key();
        let block_value = self.values.push(ValueNode::new(ValueKind::BlockRef(block)));
        self.blocks.push(BlockData::new(function, block_value));
        self.functions[function].push_block(block);
        block
    }

    pub fn make_constant(&mut self, ty: Type, value: i64) -> Value {
        self.values.push(ValueNode::new(ValueKind::Constant { ty, value }))
    }

    pub fn make_undef(&mut self, ty: Type) -> Value {
        self.values.push(ValueNode::new(ValueKind::Undef(ty)))
    }

    // ---- read access --------------------------------------------------

    pub fn functions(&self) -> impl Iterator<Item = Function> + '_ {
        self.functions.keys()
    }

    pub fn function(&self, f: Function) -> &FunctionData {
        &self.functions[f]
    }

    pub fn block(&self, b: BasicBlock) -> &BlockData {
        &self.blocks[b]
    }

    pub fn inst(&self, i: Inst) -> &InstData {
        &self.insts[i]
    }

    pub fn value(&self, v: Value) -> &ValueNode {
        &self.values[v]
    }

    pub fn value_type(&self, v: Value) -> &Type {
        self.values[v].ty()
    }

    pub fn inst_result(&self, i: Inst) -> Option<Value> {
        self.insts[i].result
    }

    pub fn block_as_value(&self, resolve: Value) -> BasicBlock {
        match &self.values[resolve].kind {
            ValueKind::BlockRef(b) => *b,
            other => panic!("expected a block reference value, found {other:?}"),
        }
    }

    pub fn function_as_value(&self, resolve: Value) -> Function {
        match &self.values[resolve].kind {
            ValueKind::FunctionRef(f) => *f,
            other => panic!("expected a function reference value, found {other:?}"),
        }
    }

    /// The set of predecessor blocks of `block`, derived from terminators —
    /// always consistent with them because it is computed from them rather
    /// than cached.
    pub fn predecessors(&self, function: Function, block: BasicBlock) -> Vec<BasicBlock> {
        let mut preds = Vec::new();
        for &candidate in self.functions[function].blocks() {
            if !self.blocks[candidate].is_attached() {
                continue;
            }
            if let Some(term) = &self.blocks[candidate].terminator {
                for succ in term.target_blocks(|v| self.block_as_value(v)) {
                    if succ == block {
                        preds.push(candidate);
                    }
                }
            }
        }
        preds
    }

    pub fn successors(&self, block: BasicBlock) -> smallvec::SmallVec<[BasicBlock; 2]> {
        match &self.blocks[block].terminator {
            Some(term) => term.target_blocks(|v| self.block_as_value(v)),
            None => smallvec::SmallVec::new(),
        }
    }

    /// A `Call` is pure only if the callee function has no reachable `Store`
    /// and is not recursive through an impure path. Computing that exactly
    /// requires a whole-program fixed point; in practice the optimizer is
    /// conservative and treats every `Call` as impure, leaving purity
    /// analysis of callees out of scope (no pass
    /// here claims to prove a callee pure).
    pub fn is_pure_instruction(&self, inst: Inst) -> bool {
        self.insts[inst].data.is_pure_ignoring_calls()
    }

    // ---- mutation -------------------------------------------------------

    fn infer_result_type(&self, data: &Instruction) -> Option<Type> {
        match data {
            Instruction::Alloc { inner } => Some(Type::pointer_to(inner.clone())),
            Instruction::Store { .. } => None,
            Instruction::Load { ptr } => Some(
                self.value_type(*ptr)
                    .pointee()
                    .expect("load operand must be a pointer")
                    .clone(),
            ),
            Instruction::BinaryOp { op, lhs, .. } => Some(op.result_type(self.value_type(*lhs))),
            Instruction::UnaryOp { value, .. } => Some(self.value_type(*value).clone()),
            Instruction::Phi { ty, .. } => Some(ty.clone()),
            Instruction::Call { callee, .. } => {
                let callee_fn = self.function_as_value(*callee);
                let ret = &self.functions[callee_fn].signature.ret;
                if ret.is_void() {
                    None
                } else {
                    Some(ret.clone())
                }
            }
        }
    }

    fn register_user(&mut self, user: User, operands: &[Value]) {
        for &v in operands {
            self.values[v].users.insert(user);
        }
    }

    fn unregister_user(&mut self, user: User, operands: &[Value]) {
        for &v in operands {
            if let Some(node) = self.values.get_mut(v) {
                node.users.remove(&user);
            }
        }
    }

    /// Inserts `data` at position `index` within `block`'s instruction
    /// list (`index == block.insts().len()` appends). Returns the new
    /// instruction's handle and, if it produces one, its result value.
    fn insert_at(&mut self, block: BasicBlock, index: usize, data: Instruction) -> Inst {
        let operands = data.operands();
        let result_ty = self.infer_result_type(&data);
        let inst = self.insts.next_key();
        self.register_user(User::Inst(inst), &operands);
        let result = result_ty.map(|ty| self.values.push(ValueNode::new(ValueKind::Instruction { ty, inst })));
        let mut node = InstData::new(block, data);
        node.result = result;
        let pushed = self.insts.push(node);
        debug_assert_eq!(pushed, inst);
        self.blocks[block].insert_at(index, inst);
        inst
    }

    pub fn push_back(&mut self, block: BasicBlock, data: Instruction) -> Inst {
        let index = self.blocks[block].insts().len();
        self.insert_at(block, index, data)
    }

    /// Inserts at the head of `block`, ahead of every existing instruction.
    /// Used by `alloc-to-phi` to place newly-inserted Phis, which must
    /// precede any instruction that could read them.
    pub fn insert_front(&mut self, block: BasicBlock, data: Instruction) -> Inst {
        self.insert_at(block, 0, data)
    }

    /// `insertBefore(instr, new)`: `before` must already be attached to a
    /// block or this panics — inserting relative to a detached instruction
    /// is a caller bug.
    pub fn insert_before(&mut self, before: Inst, data: Instruction) -> Inst {
        let block = self.insts[before].block;
        let index = self.blocks[block]
            .position(before)
            .expect("cannot insert before a detached instruction");
        self.insert_at(block, index, data)
    }

    pub fn insert_after(&mut self, after: Inst, data: Instruction) -> Inst {
        let block = self.insts[after].block;
        let index = self.blocks[block]
            .position(after)
            .expect("cannot insert after a detached instruction");
        self.insert_at(block, index + 1, data)
    }

    /// Relocates an already-built instruction to a new position, immediately
    /// before `before`. `inst` keeps its identity (handle, result value,
    /// operand/user edges) — only its position moves. Fails with
    /// `AlreadyParented` if `inst` is still attached to a block; `remove` it
    /// first to detach it, then move it.
    pub fn move_before(&mut self, before: Inst, inst: Inst) -> Result<(), IrError> {
        let current_block = self.insts[inst].block;
        if self.blocks[current_block].position(inst).is_some() {
            return Err(IrError::AlreadyParented);
        }
        let target_block = self.insts[before].block;
        let index = self.blocks[target_block]
            .position(before)
            .expect("cannot move before a detached instruction");
        self.insts[inst].block = target_block;
        self.blocks[target_block].insert_at(index, inst);
        Ok(())
    }

    /// `remove(instr)`: detaches `inst` from its block. Fails with
    /// `StillInUse` if its result still has users.
    pub fn remove(&mut self, inst: Inst) -> Result<(), IrError> {
        if let Some(result) = self.insts[inst].result {
            if !self.values[result].users().is_empty() {
                return Err(IrError::StillInUse);
            }
        }
        let block = self.insts[inst].block;
        if let Some(index) = self.blocks[block].position(inst) {
            self.blocks[block].remove_at(index);
        }
        let operands = self.insts[inst].data.operands();
        self.unregister_user(User::Inst(inst), &operands);
        Ok(())
    }

    /// `deleteDeep(value)` specialized to instructions (the common case for
    /// every pass in this workspace): `remove` it, then sever its operand
    /// edges and mark its result deleted.
    pub fn delete_deep(&mut self, inst: Inst) -> Result<(), IrError> {
        self.remove(inst)?;
        if let Some(result) = self.insts[inst].result {
            self.values[result].mark_deleted();
        }
        Ok(())
    }

    /// `replaceAllUses(old, new)`: rewrites every operand slot currently
    /// holding `old` to hold `new` instead.
    pub fn replace_all_uses(&mut self, old: Value, new: Value) -> Result<(), IrError> {
        if old == new {
            return Ok(());
        }
        {
            let old_ty = self.values[old].ty().clone();
            let new_ty = self.values[new].ty().clone();
            if old_ty != new_ty {
                return Err(IrError::TypeMismatch { old: old_ty, new: new_ty });
            }
        }
        let users: Vec<User> = self.values[old].users().iter().copied().collect();
        for user in &users {
            match *user {
                User::Inst(inst) => {
                    for slot in self.insts[inst].data.operands_mut() {
                        if *slot == old {
                            *slot = new;
                        }
                    }
                }
                User::Terminator(block) => {
                    if let Some(term) = self.blocks[block].terminator.as_mut() {
                        for slot in term.operands_mut() {
                            if *slot == old {
                                *slot = new;
                            }
                        }
                    }
                }
            }
        }
        let drained: Vec<User> = self.values[old].users.drain().collect();
        self.values[new].users.extend(drained);
        Ok(())
    }

    /// `replaceOperand(use_site, i, new)` for an instruction operand.
    pub fn replace_operand_in_inst(&mut self, inst: Inst, index: usize, new: Value) {
        let old = {
            let operands = self.insts[inst].data.operands();
            operands[index]
        };
        self.unregister_user(User::Inst(inst), &[old]);
        {
            let mut operands = self.insts[inst].data.operands_mut();
            *operands[index] = new;
        }
        self.register_user(User::Inst(inst), &[new]);
    }

    /// Replaces a `Phi`'s source map wholesale. `alloc-to-phi` builds a Phi
    /// with an empty source map so its result `Value` exists while loads are
    /// being rewritten, then fills it in once every predecessor's reaching
    /// definition is known; this is the primitive that lets it do so without
    /// reaching into `InstData` directly.
    pub fn set_phi_sources(&mut self, inst: Inst, sources: std::collections::BTreeMap<BasicBlock, Value>) {
        let Instruction::Phi { ty, sources: old_sources } = &self.insts[inst].data else {
            panic!("set_phi_sources called on a non-Phi instruction");
        };
        let ty = ty.clone();
        let old_values: Vec<Value> = old_sources.values().copied().collect();
        self.unregister_user(User::Inst(inst), &old_values);
        let new_values: Vec<Value> = sources.values().copied().collect();
        self.insts[inst].data = Instruction::Phi { ty, sources };
        self.register_user(User::Inst(inst), &new_values);
    }

    /// `setTerminator(block, term)`: replaces `block`'s terminator; the old
    /// terminator's operand edges are severed (it is deep-deleted — it never
    /// had a `Value` of its own to mark deleted).
    pub fn set_terminator(&mut self, block: BasicBlock, term: Terminator) {
        if let Some(old) = self.blocks[block].terminator.take() {
            let operands = old.operands();
            self.unregister_user(User::Terminator(block), &operands);
        }
        let operands = term.operands();
        self.register_user(User::Terminator(block), &operands);
        self.blocks[block].terminator = Some(term);
    }

    /// Deletes an entire block: all of its instructions and its terminator
    /// are torn down unconditionally (no `StillInUse` check), since this is
    /// only ever called on blocks already proven unreachable by
    /// `DeadBlockElimination`, whose remaining referents are by construction
    /// other dead blocks being deleted in the same pass.
    pub fn delete_block(&mut self, function: Function, block: BasicBlock) {
        let insts: Vec<Inst> = self.blocks[block].insts().to_vec();
        for inst in insts {
            let operands = self.insts[inst].data.operands();
            self.unregister_user(User::Inst(inst), &operands);
            if let Some(result) = self.insts[inst].result {
                self.values[result].mark_deleted();
            }
        }
        if let Some(term) = self.blocks[block].terminator.take() {
            let operands = term.operands();
            self.unregister_user(User::Terminator(block), &operands);
        }
        let block_value = self.blocks[block].value;
        self.blocks[block].detach();
        self.values[block_value].mark_deleted();
        self.functions[function].remove_block(block);
    }

    pub fn append_block_to_function(&mut self, function: Function, block: BasicBlock) {
        self.functions[function].push_block(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BinaryOpKind;

    fn simple_add_function(program: &mut Program) -> Function {
        let f = program.declare_function("main", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let two = program.make_constant(Type::Integer(32), 2);
        let three = program.make_constant(Type::Integer(32), 3);
        let add = program.push_back(
            entry,
            Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: two, rhs: three },
        );
        let result = program.inst_result(add).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(result) });
        f
    }

    #[test]
    fn builds_and_links_operand_edges() {
        let mut program = Program::new();
        let f = simple_add_function(&mut program);
        let entry = program.function(f).entry();
        assert_eq!(program.block(entry).insts().len(), 1);
        let add_inst = program.block(entry).insts()[0];
        let result = program.inst_result(add_inst).unwrap();
        assert_eq!(program.value(result).users().len(), 1);
    }

    #[test]
    fn replace_all_uses_rewires_terminator_and_instructions() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let five = program.make_constant(Type::Integer(32), 5);
        let six = program.make_constant(Type::Integer(32), 6);
        program.set_terminator(entry, Terminator::Return { value: Some(five) });
        program.replace_all_uses(five, six).unwrap();
        match program.block(entry).terminator.as_ref().unwrap() {
            Terminator::Return { value } => assert_eq!(*value, Some(six)),
            _ => panic!("expected return"),
        }
        assert!(program.value(five).users().is_empty());
        assert_eq!(program.value(six).users().len(), 1);
    }

    #[test]
    fn remove_fails_when_result_still_used() {
        let mut program = Program::new();
        let f = simple_add_function(&mut program);
        let entry = program.function(f).entry();
        let add_inst = program.block(entry).insts()[0];
        assert!(matches!(program.remove(add_inst), Err(IrError::StillInUse)));
    }

    #[test]
    fn move_before_relocates_a_detached_instruction() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let one = program.make_constant(Type::Integer(32), 1);
        let five = program.make_constant(Type::Integer(32), 5);
        let marker = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: one, rhs: one });
        let anchor = program.push_back(entry, Instruction::BinaryOp { op: BinaryOpKind::Add, lhs: five, rhs: five });
        let anchor_result = program.inst_result(anchor).unwrap();
        program.set_terminator(entry, Terminator::Return { value: Some(anchor_result) });

        program.remove(marker).unwrap();
        assert!(!program.block(entry).insts().contains(&marker));

        program.move_before(anchor, marker).unwrap();
        assert_eq!(program.block(entry).insts(), &[marker, anchor]);
    }

    #[test]
    fn move_before_refuses_an_already_parented_instruction() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Integer(32)));
        let entry = program.function(f).entry();
        let alloc = program.push_back(entry, Instruction::Alloc { inner: Type::Integer(32) });
        let alloc_value = program.inst_result(alloc).unwrap();
        let load = program.push_back(entry, Instruction::Load { ptr: alloc_value });
        // `alloc` is still attached; moving it without detaching first is a bug.
        assert!(matches!(program.move_before(load, alloc), Err(IrError::AlreadyParented)));
    }
}
