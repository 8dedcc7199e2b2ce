use crate::sat::formula::{Lit, Var, VarMap};
use crate::sat::formula::assignment::*;
use crate::sat::formula::clause::*;
use crate::sat::formula::subsumes::*;
use crate::sat::formula::util::*;
use super::{SearchRes, SearchSettings, Searcher};
use super::super::budget::Budget;
use self::elim_queue::ElimOcc;
use self::subsumption_queue::*;

pub mod elim_clauses;
mod elim_queue;
mod scc;
mod subsumption_queue;


pub struct SimplificatorSettings {
    pub grow: usize, // Allow a variable elimination step to grow by a number of clauses (default to zero).
    pub clause_lim: i32, // Variables are not eliminated if it produces a resolvent with a length above this limit. -1 means no limit.
    pub subsumption_lim: i32, // Do not check if subsumption against a clause larger than this. -1 means no limit.
    pub simp_garbage_frac: f64, // A different limit for when to issue a GC during simplification (Also see 'garbage_frac').
    pub use_asymm: bool,        // Shrink clauses by asymmetric branching.
    pub use_elim: bool,         // Perform variable elimination.
}

impl Default for SimplificatorSettings {
    fn default() -> Self {
        SimplificatorSettings {
            grow: 0,
            clause_lim: 20,
            subsumption_lim: 1000,
            simp_garbage_frac: 0.5,
            use_asymm: false,
            use_elim: true,
        }
    }
}


#[derive(Default)]
struct Stats {
    merges: u64,
    asymm_lits: u64,
    eliminated_vars: u64,
}


pub struct Simplificator {
    settings: SimplificatorSettings,
    stats: Stats,
    elimocc: ElimOcc,
    touched: VarMap<i8>,
    n_touched: usize,
    subsumption_queue: SubsumptionQueue,
}

impl Simplificator {
    pub fn new(settings: SimplificatorSettings) -> Self {
        Simplificator {
            settings,
            stats: Stats::default(),
            elimocc: ElimOcc::new(),
            touched: VarMap::new(),
            n_touched: 0,
            subsumption_queue: SubsumptionQueue::new(),
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.elimocc.init_var(v);
        self.touched.insert(&v, 0);
    }

    pub fn add_clause(&mut self, search: &mut Searcher, ps: &[Lit]) -> bool {
        for l in ps.iter() {
            assert!(!self.elimocc.is_eliminated(l.var()));
        }

        match search.add_clause(ps) {
            super::AddClauseRes::UnSAT => false,
            super::AddClauseRes::Consumed => true,
            super::AddClauseRes::Added(cr) => {
                // NOTE: the clause is added to the queue immediately and then
                // again during 'gather_touched_clauses()'. If nothing happens
                // in between, it will only be checked once. Otherwise, it may
                // be checked twice unnecessarily. This is an unfortunate
                // consequence of how backward subsumption is used to mimic
                // forward subsumption.
                self.subsumption_queue.push(cr);

                let lits = search.bt.ca.view(cr).lits().to_vec();
                self.elimocc.add_clause(cr, &lits);
                for &lit in lits.iter() {
                    self.touched[&lit.var()] = 1;
                    self.n_touched += 1;
                }

                true
            }
        }
    }

    pub fn solve_limited(
        &mut self,
        mut search: Searcher,
        ss: &SearchSettings,
        budget: &Budget,
        elimclauses: &mut elim_clauses::ElimClauses,
        assumptions: &[Lit],
    ) -> SearchRes {
        let mut extra_frozen: Vec<Var> = Vec::new();

        // Assumptions must be temporarily frozen to run variable elimination:
        for lit in assumptions.iter() {
            let ref mut st = self.elimocc.var_status[&lit.var()];

            // If an assumption has been eliminated, remember it.
            assert!(!st.eliminated);
            if !st.frozen {
                // Freeze and store.
                st.frozen = true;
                extra_frozen.push(lit.var());
            }
        }

        if search.preprocess() && self.eliminate(&mut search, budget, elimclauses) {
            match search.search(ss, budget, assumptions) {
                SearchRes::Interrupted(prog, ns) => {
                    // Unfreeze the assumptions that were frozen:
                    for &v in extra_frozen.iter() {
                        self.elimocc.var_status[&v].frozen = false;
                        self.elimocc.elim.update_elim_heap(v, &self.elimocc.var_status, &ns.bt.assigns);
                    }

                    SearchRes::Interrupted(prog, ns)
                }

                other => other,
            }
        } else {
            SearchRes::UnSAT(search.stats())
        }
    }

    pub fn eliminate(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut elim_clauses::ElimClauses,
    ) -> bool {
        if !self.eliminate_equivalences(search, elimclauses) {
            return false;
        }

        // Main simplification loop:
        while self.n_touched > 0 || self.subsumption_queue.assigns_left(&search.bt.assigns) > 0
            || self.elimocc.elim.len() > 0
        {
            self.gather_touched_clauses(&mut search.bt.ca);

            if !self.backward_subsumption_check(search, budget, true) {
                return false;
            }

            // Empty elim_heap and return immediately on user-interrupt:
            if budget.interrupted() {
                assert_eq!(self.subsumption_queue.assigns_left(&search.bt.assigns), 0);
                assert!(self.subsumption_queue.is_empty());
                assert_eq!(self.n_touched, 0);
                self.elimocc.elim.clear();
                return true;
            }

            trace!("ELIM: vars = {}", self.elimocc.elim.len());
            let mut cnt = 0;
            while let Some(var) = self.elimocc.elim.pop() {
                if budget.interrupted() {
                    break;
                }
                if !self.elimocc.is_eliminated(var) && search.bt.assigns.is_undef(var) {
                    if cnt % 100 == 0 {
                        trace!("elimination left: {:10}", self.elimocc.elim.len());
                    }

                    if self.settings.use_asymm {
                        // Temporarily freeze variable. Otherwise, it would immediately end up on the queue again:
                        let was_frozen = self.elimocc.is_frozen(var);
                        self.elimocc.var_status[&var].frozen = true;
                        if !self.asymm_var(search, budget, var) {
                            return false;
                        }
                        self.elimocc.var_status[&var].frozen = was_frozen;
                    }

                    // At this point, the variable may have been set by asymmetric branching, so check it
                    // again. Also, don't eliminate frozen variables:
                    if self.settings.use_elim && search.bt.assigns.is_undef(var)
                        && !self.elimocc.is_frozen(var)
                        && !self.eliminate_var(search, budget, elimclauses, var)
                    {
                        return false;
                    }

                    if search.bt.ca.check_garbage(self.settings.simp_garbage_frac) {
                        self.garbage_collect(search);
                    }
                }

                cnt += 1;
            }

            assert!(self.subsumption_queue.is_empty());
        }

        true
    }

    // Detect literal equivalences via SCC on the binary implication graph and
    // substitute each non-representative literal by its class representative
    // throughout the clause set, logging a reconstruction entry per
    // substituted variable so its value can be recovered from the
    // representative's value after solving the reduced formula.
    fn eliminate_equivalences(
        &mut self,
        search: &mut Searcher,
        elimclauses: &mut elim_clauses::ElimClauses,
    ) -> bool {
        if !search.bt.assigns.is_ground_level() {
            search.cancel_until(GROUND_LEVEL);
        }

        let n_vars = search.number_of_vars();
        let mut binaries: Vec<(Lit, Lit)> = Vec::new();
        for &cr in search.ctx.db.clauses() {
            let c = search.bt.ca.view(cr);
            if !c.is_deleted() && c.len() == 2 {
                let lits = c.lits();
                binaries.push((lits[0], lits[1]));
            }
        }

        let subst = match scc::run(n_vars, &binaries) {
            scc::Outcome::Contradiction => return false,
            scc::Outcome::Substitution(s) => s,
        };

        let mut effective: VarMap<Lit> = VarMap::new();
        for (v, &rep) in subst.iter() {
            if !self.elimocc.is_frozen(v) && !self.elimocc.is_eliminated(v) {
                effective.insert(&v, rep);
            }
        }
        if effective.iter().next().is_none() {
            return true;
        }

        let affected: Vec<ClauseRef> = search.ctx.db.clauses().iter().cloned()
            .chain(search.ctx.db.learnts().iter().cloned())
            .filter(|&cr| {
                let c = search.bt.ca.view(cr);
                !c.is_deleted() && c.lits().iter().any(|l| effective.get(&l.var()).is_some())
            })
            .collect();

        for cr in affected {
            let old_lits = search.bt.ca.view(cr).lits().to_vec();
            let mut new_lits: Vec<Lit> = Vec::with_capacity(old_lits.len());
            let mut tautology = false;
            for &l in &old_lits {
                let rl = scc::resolve(&effective, l);
                if new_lits.contains(&!rl) {
                    tautology = true;
                    break;
                }
                if !new_lits.contains(&rl) {
                    new_lits.push(rl);
                }
            }

            self.remove_clause(search, cr);
            if tautology {
                continue;
            }
            if new_lits.is_empty() {
                return false;
            }
            if !self.add_clause(search, &new_lits) {
                return false;
            }
        }

        for (v, &rep) in effective.iter() {
            elimclauses.mk_elim_clause(v, &[v.neg_lit(), rep]);
            elimclauses.mk_elim_clause(v, &[v.pos_lit(), !rep]);
            self.elimocc.var_status[&v].eliminated = true;
            self.stats.eliminated_vars += 1;
        }

        true
    }

    fn asymm_var(&mut self, search: &mut Searcher, budget: &Budget, v: Var) -> bool {
        let cls = {
            let cls = self.elimocc.occurs.lookup(&v, &search.bt.ca);
            if !search.bt.assigns.is_undef(v) || cls.len() == 0 {
                return true;
            }
            cls.clone()
        };

        let mut bug = false;
        for &cr in cls.iter() {
            // Mimics a quirk of the original elimination order: after a clause
            // shrinks past length 2, the following candidate in the batch is
            // skipped once before resuming normal processing.
            if bug {
                bug = false;
                continue;
            }

            if let Some(l) = asymmetric_branching(search, v, cr) {
                if search.bt.ca.view(cr).len() > 2 {
                    bug = true;
                }

                self.stats.asymm_lits += 1;
                if !self.strengthen_clause(search, cr, l) {
                    return false;
                }
            }
        }

        self.backward_subsumption_check(search, budget, false)
    }

    fn remove_clause(&mut self, search: &mut Searcher, cr: ClauseRef) {
        for &lit in search.bt.ca.view(cr).lits() {
            self.elimocc.elim.bump_lit_occ(&lit, -1);
            self.elimocc
                .elim
                .update_elim_heap(lit.var(), &self.elimocc.var_status, &search.bt.assigns);
            self.elimocc.occurs.smudge(&lit.var());
        }

        search.bt.watches.unwatch_clause_lazy(search.bt.ca.view(cr));
        search.ctx.db.remove_clause(&mut search.bt.ca, cr);
    }

    fn strengthen_clause(&mut self, search: &mut Searcher, cr: ClauseRef, l: Lit) -> bool {
        assert!(search.bt.assigns.is_ground_level());

        self.subsumption_queue.push(cr);

        let len = search.bt.ca.view(cr).len();
        if len == 2 {
            self.remove_clause(search, cr);
            let unit = {
                let c = search.bt.ca.edit(cr);
                c.strengthen(l);
                c.head()[0]
            };
            try_assign_lit(&mut search.bt.assigns, unit, None) && search.bt.propagate().is_none()
        } else {
            search.bt.watches.unwatch_clause_strict(search.bt.ca.view(cr), cr);
            search.ctx.db.edit_clause(&mut search.bt.ca, cr, |c| {
                c.strengthen(l);
                assert_eq!(c.len(), len - 1);
            });
            search.bt.watches.watch_clause(search.bt.ca.view(cr), cr);

            self.elimocc.occurs.remove_occ(&l.var(), cr);
            self.elimocc.elim.bump_lit_occ(&l, -1);
            self.elimocc.elim.update_elim_heap(l.var(), &self.elimocc.var_status, &search.bt.assigns);
            true
        }
    }

    fn eliminate_var(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut elim_clauses::ElimClauses,
        v: Var,
    ) -> bool {
        assert!(!self.elimocc.is_frozen(v) && !self.elimocc.is_eliminated(v));
        assert!(search.bt.assigns.is_undef(v));

        // Split the occurrences into positive and negative:
        let cls = self.elimocc.occurs.lookup(&v, &search.bt.ca).clone();
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for &cr in cls.iter() {
            for l in search.bt.ca.view(cr).lits() {
                if l.var() == v {
                    if l.sign() {
                        neg.push(cr);
                    } else {
                        pos.push(cr);
                    }
                    break;
                }
            }
        }

        // Check wether the increase in number of clauses stays within the allowed ('grow'). Moreover, no
        // clause must exceed the limit on the maximal clause size (if it is set):
        let mut cnt = 0;
        for &pr in pos.iter() {
            for &nr in neg.iter() {
                self.stats.merges += 1;
                if let Some(resolvent) = merge(v, search.bt.ca.literals(pr), search.bt.ca.literals(nr)) {
                    cnt += 1;
                    if cnt > cls.len() + self.settings.grow
                        || (self.settings.clause_lim != -1
                            && (resolvent.len() as i32) > self.settings.clause_lim)
                    {
                        return true;
                    }
                }
            }
        }

        // Delete and store old clauses:
        self.elimocc.var_status[&v].eliminated = true;
        search.ctx.heur.set_decision_var(v, false);
        self.stats.eliminated_vars += 1;

        if pos.len() > neg.len() {
            for &cr in neg.iter() {
                elimclauses.mk_elim_clause(v, search.bt.ca.view(cr).lits());
            }
            elimclauses.mk_elim_unit(v.pos_lit());
        } else {
            for &cr in pos.iter() {
                elimclauses.mk_elim_clause(v, search.bt.ca.view(cr).lits());
            }
            elimclauses.mk_elim_unit(v.neg_lit());
        }

        for &cr in cls.iter() {
            self.remove_clause(search, cr);
        }

        // Produce clauses in cross product:
        for &pr in pos.iter() {
            for &nr in neg.iter() {
                self.stats.merges += 1;
                if let Some(resolvent) = merge(v, search.bt.ca.literals(pr), search.bt.ca.literals(nr)) {
                    if !self.add_clause(search, &resolvent[..]) {
                        return false;
                    }
                }
            }
        }

        // Free occurs list for this variable:
        self.elimocc.occurs.clear_var(&v);

        self.backward_subsumption_check(search, budget, false)
    }

    // Backward subsumption + backward subsumption resolution
    fn backward_subsumption_check(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        verbose: bool,
    ) -> bool {
        assert!(search.bt.assigns.is_ground_level());

        if verbose {
            trace!(
                "BWD-SUB: queue = {}, trail = {}",
                self.subsumption_queue.len(),
                self.subsumption_queue.assigns_left(&search.bt.assigns)
            );
        }

        let mut cnt = 0u64;
        let mut subsumed = 0u64;
        let mut deleted_literals = 0u64;

        while let Some(job) = self.subsumption_queue.pop(&search.bt.ca, &search.bt.assigns) {
            // Empty subsumption queue and return immediately on user-interrupt:
            if budget.interrupted() {
                self.subsumption_queue.clear(&search.bt.assigns);
                break;
            }

            if verbose && cnt % 1000 == 0 {
                trace!(
                    "subsumption left: {:10} ({:10} subsumed, {:10} deleted literals)",
                    self.subsumption_queue.len(),
                    subsumed,
                    deleted_literals
                );
            }
            cnt += 1;

            match job {
                SubsumptionJob::Assign(unit) => {
                    for &cj in self.elimocc.occurs.lookup(&unit.var(), &search.bt.ca).clone().iter() {
                        if {
                            let c = search.bt.ca.view(cj);
                            !c.is_deleted()
                                && (self.settings.subsumption_lim == -1
                                    || (c.len() as i32) < self.settings.subsumption_lim)
                        } {
                            match unit_subsumes(unit, search.bt.ca.view(cj)) {
                                Subsumes::Different => {}

                                Subsumes::Exact => {
                                    subsumed += 1;
                                    self.remove_clause(search, cj);
                                }

                                Subsumes::LitSign(l) => {
                                    deleted_literals += 1;
                                    if !self.strengthen_clause(search, cj, !l) {
                                        return false;
                                    }
                                }
                            }
                        }
                    }
                }

                SubsumptionJob::Clause(cr) => {
                    let best = {
                        let c = search.bt.ca.view(cr);
                        let mut best = c.head()[0].var();
                        for &lit in &c.lits()[1..] {
                            if self.elimocc.occurs.occs_dirty(lit.var()) < self.elimocc.occurs.occs_dirty(best) {
                                best = lit.var();
                            }
                        }
                        best
                    };

                    for &cj in self.elimocc.occurs.lookup(&best, &search.bt.ca).clone().iter() {
                        if search.bt.ca.is_deleted(cr) {
                            break;
                        }

                        if cj != cr && {
                            let c = search.bt.ca.view(cj);
                            !c.is_deleted()
                                && (self.settings.subsumption_lim == -1
                                    || (c.len() as i32) < self.settings.subsumption_lim)
                        } {
                            match subsumes(search.bt.ca.view(cr), search.bt.ca.view(cj)) {
                                Subsumes::Different => {}

                                Subsumes::Exact => {
                                    subsumed += 1;
                                    self.remove_clause(search, cj);
                                }

                                Subsumes::LitSign(l) => {
                                    deleted_literals += 1;
                                    if !self.strengthen_clause(search, cj, !l) {
                                        return false;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        true
    }

    fn gather_touched_clauses(&mut self, ca: &mut ClauseAllocator) {
        if self.n_touched == 0 {
            return;
        }

        self.subsumption_queue.remark_touched(ca, false);

        for (v, touched) in self.touched.iter_mut() {
            if *touched != 0 && !self.elimocc.is_eliminated(v) {
                for &cr in self.elimocc.occurs.lookup(&v, ca) {
                    let c = ca.edit(cr);
                    if !c.is_touched() {
                        self.subsumption_queue.push(cr);
                        c.set_touched(true);
                    }
                }
                *touched = 0;
            }
        }

        self.subsumption_queue.remark_touched(ca, true);
        self.n_touched = 0;
    }

    fn garbage_collect(&mut self, search: &mut Searcher) {
        let mut to = ClauseAllocator::new_for_gc(&search.bt.ca);
        self.reloc_gc(&mut search.bt.ca, &mut to);
        search.reloc_gc(to);
    }

    fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        self.elimocc.occurs.reloc_gc(from, to);
        self.subsumption_queue.reloc_gc(from, to);
    }

    // TODO: remove
    pub fn off(search: &mut Searcher) {
        search.ctx.db.settings.remove_satisfied = true;
        search.bt.ca.set_extra_clause_field(false);

        // Force full cleanup (this is safe and desirable since it only happens once):
        search.ctx.heur.rebuild_order_heap(&search.bt.assigns);
        search.garbage_collect();
    }

    pub fn on(search: &mut Searcher) {
        search.bt.ca.set_extra_clause_field(true);
        search.ctx.db.settings.remove_satisfied = false;
    }
}


fn asymmetric_branching(search: &mut Searcher, v: Var, cr: ClauseRef) -> Option<Lit> {
    assert!(search.bt.assigns.is_ground_level());

    let l = {
        let c = search.bt.ca.view(cr);
        if c.is_deleted() || satisfied_with_assignment(c.lits(), &search.bt.assigns) {
            return None;
        }

        search.bt.assigns.new_decision_level();

        let mut vl = None;
        for &lit in c.lits() {
            if v == lit.var() {
                vl = Some(lit);
            } else if search.bt.assigns.is_undef(lit.var()) {
                search.bt.assigns.assign_lit(!lit, None);
            }
        }

        vl.unwrap()
    };

    let res = search.bt.propagate();
    search.cancel_until(GROUND_LEVEL);
    res.map(|_| l)
}
