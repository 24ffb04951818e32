use rustc_hash::FxHashMap;

use weft_analysis::DominatorInfo;
use weft_ir::{Function, Program};

/// Carried through a single driver run over one [`Function`]: caches
/// [`DominatorInfo`] per function and tracks whether the pass currently
/// running reported a change, distinguishing an instruction-level rewrite
/// (`instr_changed`) from a CFG-level one (`graph_changed`) — only the
/// latter invalidates the dominator cache.
pub struct Context<'p> {
    program: &'p mut Program,
    dom_cache: FxHashMap<Function, DominatorInfo>,
    instr_changed: bool,
    graph_changed: bool,
}

impl<'p> Context<'p> {
    pub fn new(program: &'p mut Program) -> Self {
        Self { program, dom_cache: FxHashMap::default(), instr_changed: false, graph_changed: false }
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        self.program
    }

    /// A pass calls this after rewriting operands or deleting instructions
    /// without altering the CFG shape.
    pub fn report_instr_changed(&mut self) {
        self.instr_changed = true;
    }

    /// A pass calls this after adding/removing a block or edge; invalidates
    /// the cached `DominatorInfo` for `function` since it is no longer valid.
    pub fn report_graph_changed(&mut self, function: Function) {
        self.graph_changed = true;
        self.dom_cache.remove(&function);
    }

    /// Returns a current `DominatorInfo` for `function`, recomputing on
    /// demand and caching the result until the next `graph_changed` report.
    pub fn dom_info(&mut self, function: Function) -> &DominatorInfo {
        if !self.dom_cache.contains_key(&function) {
            let info = DominatorInfo::compute(self.program, function);
            self.dom_cache.insert(function, info);
        }
        &self.dom_cache[&function]
    }

    /// Drains and returns whether either change flag was set since the last
    /// call, resetting both.
    pub fn take_changed(&mut self) -> bool {
        let changed = self.instr_changed || self.graph_changed;
        self.instr_changed = false;
        self.graph_changed = false;
        changed
    }
}
