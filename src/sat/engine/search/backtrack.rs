use crate::sat::formula::{assignment::*, clause::*, Lit, Var};
use super::watches::Watches;


/// Bundles the three pieces of state that move together under backtracking:
/// the clause pool, the trail, and the watch lists. Kept as one struct so a
/// decision/propagation/backtrack step never forgets to touch one of them.
pub struct BacktrackableFormula {
    pub ca: ClauseAllocator,
    pub assigns: Assignment,
    pub watches: Watches,
}

impl BacktrackableFormula {
    pub fn new() -> Self {
        BacktrackableFormula {
            ca: ClauseAllocator::new(),
            assigns: Assignment::new(),
            watches: Watches::new(),
        }
    }

    pub fn new_var(&mut self) -> Var {
        let v = self.assigns.new_var();
        self.watches.init_var(v);
        v
    }


    pub fn attach(&mut self, cr: ClauseRef) {
        let c = self.ca.view(cr);
        self.watches.watch_clause(c, cr);
    }

    pub fn force_detach(&mut self, cr: ClauseRef) {
        self.watches.unwatch_clause_strict(self.ca.view(cr), cr);
    }

    pub fn lazy_detach(&mut self, cr: ClauseRef) {
        self.watches.unwatch_clause_lazy(self.ca.view(cr));
    }


    pub fn propagations(&self) -> u64 {
        self.watches.propagations
    }

    pub fn propagate(&mut self) -> Option<ClauseRef> {
        self.watches.propagate(&mut self.ca, &mut self.assigns)
    }


    pub fn is_ground_level(&self) -> bool {
        self.assigns.is_ground_level()
    }

    pub fn push_decision(&mut self, next: Lit) {
        self.assigns.new_decision_level();
        self.assigns.assign_lit(next, None);
    }


    pub fn reloc_gc(&mut self, to: &mut ClauseAllocator) {
        self.watches.reloc_gc(&mut self.ca, to);
        self.assigns.reloc_gc(&mut self.ca, to);
    }
}
