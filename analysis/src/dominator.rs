use rustc_hash::{FxHashMap, FxHashSet};

use weft_ir::{BasicBlock, Function, Program};

/// Dominance information for a single [`Function`], computed by the literal
/// iterative fixed-point algorithm (not Lengauer-Tarjan or a reverse-postorder
/// shortcut): `dom(entry) = {entry}`, `dom(b) = all blocks` for every other
/// `b`, then repeatedly `dom(b) = {b} ∪ ⋂ dom(p)` over predecessors `p` until
/// nothing changes. Simpler to audit than an RPO-based solver and cheap
/// enough at this IR's scale.
#[derive(Debug, Clone)]
pub struct DominatorInfo {
    dominators: FxHashMap<BasicBlock, FxHashSet<BasicBlock>>,
    parent: FxHashMap<BasicBlock, Option<BasicBlock>>,
    frontier: FxHashMap<BasicBlock, FxHashSet<BasicBlock>>,
}

impl DominatorInfo {
    pub fn compute(program: &Program, function: Function) -> Self {
        let entry = program.function(function).entry();
        let blocks: Vec<BasicBlock> = program
            .function(function)
            .blocks()
            .iter()
            .copied()
            .filter(|&b| program.block(b).is_attached())
            .collect();
        let universe: FxHashSet<BasicBlock> = blocks.iter().copied().collect();

        let mut dom: FxHashMap<BasicBlock, FxHashSet<BasicBlock>> = FxHashMap::default();
        for &b in &blocks {
            if b == entry {
                dom.insert(b, [entry].into_iter().collect());
            } else {
                dom.insert(b, universe.clone());
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &b in &blocks {
                if b == entry {
                    continue;
                }
                let preds = program.predecessors(function, b);
                let mut new_dom = if preds.is_empty() {
                    universe.clone()
                } else {
                    let mut iter = preds.iter();
                    let first = *iter.next().unwrap();
                    let mut acc = dom[&first].clone();
                    for &p in iter {
                        acc = acc.intersection(&dom[&p]).copied().collect();
                    }
                    acc
                };
                new_dom.insert(b);
                if new_dom != dom[&b] {
                    dom.insert(b, new_dom);
                    changed = true;
                }
            }
        }

        let reachable = forward_reachable(program, entry);

        let mut parent: FxHashMap<BasicBlock, Option<BasicBlock>> = FxHashMap::default();
        for &b in &blocks {
            if b == entry || !reachable.contains(&b) {
                parent.insert(b, None);
                continue;
            }
            let idom = dom[&b]
                .iter()
                .filter(|&&d| d != b)
                .max_by_key(|&&d| dom[&d].len())
                .copied();
            parent.insert(b, idom);
        }

        let mut frontier: FxHashMap<BasicBlock, FxHashSet<BasicBlock>> =
            blocks.iter().map(|&b| (b, FxHashSet::default())).collect();
        for &x in &blocks {
            for &b in &blocks {
                if !dom[&b].contains(&x) {
                    continue;
                }
                for s in program.successors(b) {
                    let x_strictly_dominates_s = x != s && dom[&s].contains(&x);
                    if !x_strictly_dominates_s {
                        frontier.get_mut(&x).unwrap().insert(s);
                    }
                }
            }
        }

        Self { dominators: dom, parent, frontier }
    }

    pub fn dominators(&self, b: BasicBlock) -> &FxHashSet<BasicBlock> {
        &self.dominators[&b]
    }

    pub fn parent(&self, b: BasicBlock) -> Option<BasicBlock> {
        self.parent.get(&b).copied().flatten()
    }

    pub fn frontier(&self, b: BasicBlock) -> &FxHashSet<BasicBlock> {
        &self.frontier[&b]
    }

    pub fn dominates(&self, a: BasicBlock, b: BasicBlock) -> bool {
        self.dominators(b).contains(&a)
    }

    pub fn strictly_dominates(&self, a: BasicBlock, b: BasicBlock) -> bool {
        a != b && self.dominates(a, b)
    }
}

fn forward_reachable(program: &Program, entry: BasicBlock) -> FxHashSet<BasicBlock> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![entry];
    while let Some(b) = stack.pop() {
        if !seen.insert(b) {
            continue;
        }
        for s in program.successors(b) {
            if !seen.contains(&s) {
                stack.push(s);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Instruction, Signature, Terminator, Type};

    #[test]
    fn diamond_cfg_has_expected_idoms_and_frontier() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![Type::bool()], Type::Integer(32)));
        let entry = program.function(f).entry();
        let then_block = program.create_block(f);
        let else_block = program.create_block(f);
        let join = program.create_block(f);

        let cond = program.function(f).params[0];
        let then_value = program.block(then_block).value;
        let else_value = program.block(else_block).value;
        program.set_terminator(entry, Terminator::Branch { cond, if_true: then_value, if_false: else_value });

        let join_value = program.block(join).value;
        program.set_terminator(then_block, Terminator::Jump { target: join_value });
        program.set_terminator(else_block, Terminator::Jump { target: join_value });
        program.set_terminator(join, Terminator::Return { value: None });

        let dom = DominatorInfo::compute(&program, f);
        assert_eq!(dom.parent(join), Some(entry));
        assert_eq!(dom.parent(then_block), Some(entry));
        assert!(dom.frontier(then_block).contains(&join));
        assert!(dom.frontier(else_block).contains(&join));
        assert!(dom.frontier(entry).is_empty());
    }

    #[test]
    fn isolated_self_loop_has_no_parent_and_is_dominated_by_everything() {
        let mut program = Program::new();
        let f = program.declare_function("f", Signature::new(vec![], Type::Void));
        let entry = program.function(f).entry();
        program.set_terminator(entry, Terminator::Exit);

        let isolated = program.create_block(f);
        let self_value = program.block(isolated).value;
        program.set_terminator(isolated, Terminator::Jump { target: self_value });
        let _ = program.push_back(isolated, Instruction::Alloc { inner: Type::Integer(32) });

        let dom = DominatorInfo::compute(&program, f);
        assert_eq!(dom.parent(isolated), None);
        assert!(dom.dominators(isolated).contains(&entry));
    }
}
