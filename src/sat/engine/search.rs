use crate::sat;
use crate::sat::formula::{assignment::*, clause::*, Lit, LitMap, Var};
use self::backtrack::BacktrackableFormula;
use self::conflict::{AnalyzeContext, CCMinMode, Conflict};
use self::decision_heuristic::{DecisionHeuristic, DecisionHeuristicSettings};
use super::budget::Budget;

mod backtrack;
pub mod conflict;
pub mod clause_db;
pub mod decision_heuristic;
pub mod simplify;
mod util;
mod watches;


/// Glucose-style restart trigger: compare a short-window EMA of recent learnt
/// clause LBDs against a long-window EMA. Restarting when the short-term
/// average spikes above the long-term trend means the search is wandering
/// into a region of bad decisions; cutting and retrying the decision order
/// usually pays for itself.
#[derive(Clone, Copy, Debug)]
pub struct RestartSettings {
    pub fast_window: u32,      // number of conflicts the fast EMA averages over
    pub slow_window: u32,      // number of conflicts the slow EMA averages over
    pub margin: f64,           // restart once fast >= slow * margin
    pub restart_interval: u64, // minimum conflicts between two restarts
}

impl Default for RestartSettings {
    fn default() -> Self {
        RestartSettings {
            fast_window: 32,
            slow_window: 1 << 14,
            margin: 0.90625,
            restart_interval: 50,
        }
    }
}

struct RestartTrigger {
    settings: RestartSettings,
    fast: f64,
    slow: f64,
    since_restart: u64,
}

impl RestartTrigger {
    fn new(settings: RestartSettings) -> Self {
        RestartTrigger {
            settings,
            fast: 0.0,
            slow: 0.0,
            since_restart: 0,
        }
    }

    fn update(&mut self, lbd: u32) {
        let fast_alpha = 2.0 / (self.settings.fast_window as f64 + 1.0);
        let slow_alpha = 2.0 / (self.settings.slow_window as f64 + 1.0);
        self.fast += fast_alpha * (lbd as f64 - self.fast);
        self.slow += slow_alpha * (lbd as f64 - self.slow);
        self.since_restart += 1;
    }

    /// Three guards, all required: enough conflicts since the last restart,
    /// the fast LBD average has drifted far enough above the slow trend, and
    /// the search is deep enough (at or below the fast average would mean
    /// there's barely any trail to usefully cut).
    fn should_restart(&self, current_level: DecisionLevel) -> bool {
        self.since_restart >= self.settings.restart_interval
            && self.fast >= self.slow * self.settings.margin
            && (current_level.offset() as f64) >= self.fast
    }

    fn restarted(&mut self) {
        self.since_restart = 0;
    }
}


/// Controls when the learnt clause database is thinned out. `reduce_inc`
/// grows by a factor of `reduce_inc2` after every reduction, so the interval
/// between reductions lengthens over the run as the database stabilizes.
/// Clauses whose LBD is at or below `keep_lbd` are never swept regardless of
/// their position in the activity ordering.
#[derive(Clone, Copy, Debug)]
pub struct ReduceSettings {
    pub reduce_init: u64,
    pub reduce_inc: u64,
    pub reduce_inc2: f64,
    pub keep_lbd: u32,
}

impl Default for ReduceSettings {
    fn default() -> Self {
        ReduceSettings {
            reduce_init: 2000,
            reduce_inc: 300,
            reduce_inc2: 1.1,
            keep_lbd: 2,
        }
    }
}

struct ReduceGuard {
    settings: ReduceSettings,
    next: u64,
    inc: f64,
}

impl ReduceGuard {
    fn new(settings: ReduceSettings) -> Self {
        let next = settings.reduce_init;
        let inc = settings.reduce_inc as f64;
        ReduceGuard { settings, next, inc }
    }

    fn due(&self, conflicts: u64) -> bool {
        conflicts >= self.next
    }

    fn advance(&mut self) {
        self.next += self.inc as u64;
        self.inc *= self.settings.reduce_inc2;
    }
}


struct SimplifyGuard {
    simp_db_assigns: Option<usize>, // Number of top-level assignments since last execution of 'simplify()'.
    simp_db_props: u64,
}

impl SimplifyGuard {
    pub fn new() -> Self {
        SimplifyGuard {
            simp_db_assigns: None,
            simp_db_props: 0,
        }
    }

    pub fn skip(&self, assigns: usize, propagations: u64) -> bool {
        Some(assigns) == self.simp_db_assigns || propagations < self.simp_db_props
    }

    pub fn set_next(&mut self, assigns: usize, propagations: u64, prop_limit: u64) {
        self.simp_db_assigns = Some(assigns);
        self.simp_db_props = propagations + prop_limit;
    }
}


#[derive(Default)]
struct Stats {
    solves: u64,
    starts: u64,
    decisions: u64,
    conflicts: u64,
}


#[derive(Clone, Copy, Default, Debug)]
pub struct SearchSettings {
    pub restart: RestartSettings,
    pub reduce: ReduceSettings,
}


pub enum AddClauseRes {
    UnSAT,
    Consumed,
    Added(ClauseRef),
}


pub enum SearchRes {
    UnSAT(sat::Stats),
    SAT(Assignment, sat::Stats),
    Interrupted(f64, Searcher),
}


pub struct SearcherSettings {
    pub garbage_frac: f64, // The fraction of wasted memory allowed before a garbage collection is triggered.
    pub use_rcheck: bool, // Check if a clause is already implied. Pretty costly, and subsumes subsumptions :)
}

impl Default for SearcherSettings {
    fn default() -> Self {
        SearcherSettings {
            garbage_frac: 0.20,
            use_rcheck: false,
        }
    }
}


enum LoopRes {
    UnSAT,
    SAT,
    Interrupted(f64),
    AssumpsConfl(LitMap<()>),
}


pub struct SearchCtx {
    stats: Stats,
    db: clause_db::ClauseDB,
    heur: DecisionHeuristic,
    analyze: AnalyzeContext,
    simp: SimplifyGuard,
}

impl SearchCtx {
    pub fn new(db_set: clause_db::ClauseDBSettings, heur_set: DecisionHeuristicSettings, ccmin_mode: CCMinMode) -> Self {
        SearchCtx {
            stats: Stats::default(),
            db: clause_db::ClauseDB::new(db_set),
            heur: DecisionHeuristic::new(heur_set),
            analyze: AnalyzeContext::new(ccmin_mode),
            simp: SimplifyGuard::new(),
        }
    }

    pub fn init_var(&mut self, v: Var, upol: Option<bool>, dvar: bool) {
        self.heur.init_var(v, upol, dvar);
        self.analyze.init_var(v);
    }

    pub fn decide(&mut self, assigns: &mut Assignment, ca: &ClauseAllocator, assumptions: &[Lit]) -> Result<Option<Lit>, LitMap<()>> {
        while let Some(&p) = assumptions.get(assigns.current_level().offset_from_ground()) {
            // Perform user provided assumption:
            match assigns.of_lit(p) {
                LitVal::True => {
                    // Dummy decision level:
                    assigns.new_decision_level();
                }
                LitVal::False => {
                    let conflict = self.analyze.analyze_final(ca, assigns, !p);
                    return Err(conflict);
                }
                LitVal::Undef => {
                    return Ok(Some(p));
                }
            }
        }

        // New variable decision:
        self.stats.decisions += 1;
        Ok(self.heur.pick_branch_lit(assigns))
    }

    fn analyze(&mut self, assigns: &Assignment, ca: &mut ClauseAllocator, confl: ClauseRef) -> conflict::Conflict {
        self.analyze.analyze(assigns, ca,
            confl,
            {
                let heur = &mut self.heur;
                move |v| heur.bump_activity(&v)
            },
            {
                let db = &mut self.db;
                move |ca, c| db.bump_activity(ca, c)
            }
        )
    }

    fn cancel_until(&mut self, assigns: &Assignment, level: DecisionLevel) {
        let top_level = assigns.current_level();
        for (level, trail) in assigns.levels_above_rev(level) {
            for &lit in trail.iter().rev() {
                self.heur.cancel(lit, level == top_level);
            }
        }
    }

    /// Target level for a partial restart: the shallowest level at which
    /// every variable already decided above it is less active than the
    /// variable the decision heuristic would pick next. Everything from
    /// that level up gets discarded as "stale" (lower priority than what
    /// we'd now decide); everything below it is kept since it's still at
    /// least as good a decision as we'd make fresh. Falls back to a full
    /// restart (`GROUND_LEVEL`) if no level qualifies.
    fn restart_level(&mut self, assigns: &Assignment) -> DecisionLevel {
        let top = match self.heur.top_activity(assigns) {
            Some(a) => a,
            None => return GROUND_LEVEL,
        };

        let mut candidate = GROUND_LEVEL;
        for (level, trail) in assigns.all_levels_dir() {
            if level == GROUND_LEVEL {
                continue;
            }
            if trail.iter().all(|&lit| self.heur.activity_of(lit.var()) < top) {
                return candidate;
            }
            candidate = level;
        }

        GROUND_LEVEL
    }

    fn handle_conflict(&mut self, restart: &mut RestartTrigger, bt: &mut BacktrackableFormula, confl: ClauseRef)
        -> Option<(DecisionLevel, Lit, Option<ClauseRef>)>
    {
        self.stats.conflicts += 1;

        let res =
            match self.analyze(&bt.assigns, &mut bt.ca, confl) {
                Conflict::Ground => {
                    return None;
                }

                Conflict::Unit(level, unit) => {
                    self.cancel_until(&bt.assigns, level);
                    restart.update(1);
                    (level, unit, None)
                }

                Conflict::Learned(level, lit, clause, lbd) => {
                    self.cancel_until(&bt.assigns, level);
                    let cr = self.db.learn_clause(&mut bt.ca, &clause[..]);
                    bt.ca.edit(cr).set_lbd(lbd);
                    restart.update(lbd);
                    (level, lit, Some(cr))
                }
            };

        self.heur.decay_activity();
        self.db.decay_activity();

        if self.stats.conflicts % 1000 == 0 {
            info!(
                "| {:9} | {:7} {:8} {:8} | {:8} {:8} {:6.0} | {:6.3} % |",
                self.stats.conflicts,
                self.heur.dec_vars - bt.assigns.number_of_ground_assigns(),
                self.db.stats.num_clauses,
                self.db.stats.clauses_literals,
                self.db.number_of_learnts(),
                self.db.stats.num_learnts,
                (self.db.stats.learnts_literals as f64) / (self.db.stats.num_learnts as f64),
                progress_estimate(&bt.assigns) * 100.0
            );
        }

        Some(res)
    }
}


pub struct Searcher {
    settings: SearcherSettings,
    bt: backtrack::BacktrackableFormula,
    ctx: SearchCtx
}

impl Searcher {
    pub fn new(
        settings: SearcherSettings,
        db_set: clause_db::ClauseDBSettings,
        heur_set: DecisionHeuristicSettings,
        ccmin_mode: CCMinMode,
    ) -> Self {
        Searcher {
            settings,
            bt: backtrack::BacktrackableFormula::new(),
            ctx: SearchCtx::new(db_set, heur_set, ccmin_mode)
        }
    }

    pub fn number_of_vars(&self) -> usize {
        self.bt.assigns.number_of_vars()
    }

    pub fn number_of_clauses(&self) -> usize {
        self.ctx.db.stats.num_clauses
    }

    pub fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.bt.new_var();
        self.ctx.init_var(v, upol, dvar);
        v
    }

    pub fn add_clause(&mut self, clause: &[Lit]) -> AddClauseRes {
        if self.settings.use_rcheck && is_implied(self, &clause) {
            return AddClauseRes::Consumed;
        }

        let ps = {
            let mut ps = clause.to_vec();

            // Check if clause is satisfied and remove false/duplicate literals:
            ps.sort();
            ps.dedup();
            ps.retain(|&lit| !self.bt.assigns.is_assigned_neg(lit));

            {
                let mut prev = None;
                for &lit in ps.iter() {
                    if self.bt.assigns.is_assigned_pos(lit) || prev == Some(!lit) {
                        return AddClauseRes::Consumed;
                    }
                    prev = Some(lit);
                }
            }

            ps
        };

        match &ps[..] {
            [] => { AddClauseRes::UnSAT }

            [unit] => {
                self.bt.assigns.assign_lit(*unit, None);
                match self.bt.propagate() {
                    None => AddClauseRes::Consumed,
                    Some(_) => AddClauseRes::UnSAT,
                }
            }

            lits => {
                let cr = self.ctx.db.add_clause(&mut self.bt.ca, lits);
                self.bt.attach(cr);
                AddClauseRes::Added(cr)
            }
        }
    }

    pub fn preprocess(&mut self) -> bool {
        if let None = self.bt.propagate() {
            self.try_simplify();
            true
        } else {
            false
        }
    }

    pub fn search(self, ss: &SearchSettings, budget: &Budget, assumptions: &[Lit]) -> SearchRes {
        info!("============================[ Search Statistics ]==============================");
        info!("| Conflicts |          ORIGINAL         |          LEARNT          | Progress |");
        info!("|           |    Vars  Clauses Literals |    Limit  Clauses Lit/Cl |          |");
        info!("===============================================================================");

        let res = self.search_internal(ss, budget, assumptions);

        info!("===============================================================================");
        res
    }

    fn search_internal(mut self, ss: &SearchSettings, budget: &Budget, assumptions: &[Lit]) -> SearchRes {
        self.ctx.stats.solves += 1;
        let mut restart = RestartTrigger::new(ss.restart);
        let mut reduce = ReduceGuard::new(ss.reduce);

        loop {
            match self.search_loop(budget, &mut restart, &mut reduce, assumptions) {
                LoopRes::SAT => {
                    let stats = self.stats();
                    return SearchRes::SAT(self.bt.assigns, stats);
                }

                LoopRes::UnSAT => {
                    return SearchRes::UnSAT(self.stats());
                }

                LoopRes::AssumpsConfl(_) => {
                    self.cancel_until(GROUND_LEVEL);
                    return SearchRes::UnSAT(self.stats());
                }

                LoopRes::Interrupted(c) => {
                    return SearchRes::Interrupted(c, self);
                }
            }
        }
    }

    // Description:
    //   Drive propagation, conflict analysis, restarts and database
    //   maintenance until a model is found, the formula is refuted, or the
    //   budget runs out. Restarts are triggered by `RestartTrigger` rather
    //   than a conflict countdown, so the loop only exits back to
    //   `search_internal` on SAT/UnSAT/interruption.
    fn search_loop(
        &mut self,
        budget: &Budget,
        restart: &mut RestartTrigger,
        reduce: &mut ReduceGuard,
        assumptions: &[Lit],
    ) -> LoopRes {
        self.ctx.stats.starts += 1;

        loop {
            if !self.propagate_learn_backtrack(restart) {
                return LoopRes::UnSAT;
            }

            if !budget.within(self.ctx.stats.conflicts, self.bt.propagations()) {
                let progress_estimate = progress_estimate(&self.bt.assigns);
                self.cancel_until(GROUND_LEVEL);
                return LoopRes::Interrupted(progress_estimate);
            }

            if restart.should_restart(self.bt.assigns.current_level()) {
                let level = self.ctx.restart_level(&self.bt.assigns);
                self.cancel_until(level);
                restart.restarted();
                continue;
            }

            // Simplify the set of problem clauses:
            self.try_simplify();

            if reduce.due(self.ctx.stats.conflicts) {
                {
                    let watches = &mut self.bt.watches;
                    let keep_lbd = reduce.settings.keep_lbd;
                    self.ctx.db.reduce(&mut self.bt.ca, &self.bt.assigns, keep_lbd, move |c| {
                        watches.unwatch_clause_lazy(c);
                    });
                }
                reduce.advance();

                self.try_garbage_collect();
            }

            match self.ctx.decide(&mut self.bt.assigns, &self.bt.ca, assumptions) {
                Err(confl) => { return LoopRes::AssumpsConfl(confl) }
                Ok(None) => { return LoopRes::SAT } // Model found:
                Ok(Some(next)) => {
                    self.bt.push_decision(next);
                }
            }
        }
    }

    fn propagate_learn_backtrack(&mut self, restart: &mut RestartTrigger) -> bool {
        while let Some(confl) = self.bt.propagate() {
            match self.ctx.handle_conflict(restart, &mut self.bt, confl) {
                None => { return false; }
                Some((level, lit, reason)) => {
                    self.bt.assigns.backtrack_to(level);
                    self.bt.assigns.assign_lit(lit, reason);
                    for &cr in reason.iter() {
                        self.bt.attach(cr);
                    }
                }
            }
        }
        true
    }

    // Description:
    //   Simplify the clause database according to the current top-level assigment. Currently, the only
    //   thing done here is the removal of satisfied clauses, but more things can be put here.
    fn try_simplify(&mut self) {
        if !self.bt.assigns.is_ground_level()
            || self.ctx.simp.skip(self.bt.assigns.number_of_assigns(), self.bt.propagations())
        {
            return;
        }

        {
            let watches = &mut self.bt.watches;
            self.ctx.db.remove_satisfied(&mut self.bt.ca, &self.bt.assigns, move |c| {
                watches.unwatch_clause_lazy(c);
            });
        }

        self.try_garbage_collect();

        self.ctx.heur.rebuild_order_heap(&self.bt.assigns);
        self.ctx.simp.set_next(
            self.bt.assigns.number_of_assigns(),
            self.bt.propagations(),
            self.ctx.db.stats.clauses_literals + self.ctx.db.stats.learnts_literals,
        ); // (shouldn't depend on stats really, but it will do for now)
    }

    // Revert to the state at given level (keeping all assignment at 'level' but not beyond).
    fn cancel_until(&mut self, target_level: DecisionLevel) {
        self.ctx.cancel_until(&self.bt.assigns, target_level);
        self.bt.assigns.backtrack_to(target_level);
    }


    fn try_garbage_collect(&mut self) {
        if self.bt.ca.check_garbage(self.settings.garbage_frac) {
            self.garbage_collect();
        }
    }

    fn garbage_collect(&mut self) {
        // Initialize the next region to a size corresponding to the estimated utilization degree. This
        // is not precise but should avoid some unnecessary reallocations for the new region:
        let to = ClauseAllocator::new_for_gc(&self.bt.ca);
        self.reloc_gc(to);
    }

    fn reloc_gc(&mut self, mut to: ClauseAllocator) {
        self.bt.reloc_gc(&mut to);
        self.ctx.db.reloc_gc(&mut self.bt.ca, &mut to);

        debug!(
            "|  Garbage collection:   {:12} bytes => {:12} bytes             |",
            self.bt.ca.size(), to.size()
        );
        self.bt.ca = to;
    }


    pub fn stats(&self) -> sat::Stats {
        sat::Stats {
            solves: self.ctx.stats.solves,
            restarts: self.ctx.stats.starts,
            decisions: self.ctx.stats.decisions,
            rnd_decisions: self.ctx.heur.rnd_decisions,
            conflicts: self.ctx.stats.conflicts,
            propagations: self.bt.propagations(),
            tot_literals: self.ctx.analyze.tot_literals,
            del_literals: self.ctx.analyze.max_literals - self.ctx.analyze.tot_literals,
        }
    }
}


fn is_implied(search: &mut Searcher, c: &[Lit]) -> bool {
    assert!(search.bt.assigns.is_ground_level());

    search.bt.assigns.new_decision_level();
    for &lit in c.iter() {
        match search.bt.assigns.of_lit(lit) {
            LitVal::True => {
                search.cancel_until(GROUND_LEVEL);
                return true;
            }
            LitVal::Undef => {
                search.bt.assigns.assign_lit(!lit, None);
            }
            LitVal::False => {}
        }
    }

    let result = search.bt.propagate().is_some();
    search.cancel_until(GROUND_LEVEL);
    return result;
}


fn progress_estimate(assigns: &Assignment) -> f64 {
    let vars = 1.0 / (assigns.number_of_vars() as f64);
    let mut progress = 0.0;
    let mut factor = vars;
    for (_, level_trail) in assigns.all_levels_dir() {
        progress += factor * (level_trail.len() as f64);
        factor *= vars;
    }
    progress
}
