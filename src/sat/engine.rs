use crate::sat::{SolveRes, Solver, Stats};
use crate::sat::error::{SolverError, SolverResult};
use crate::sat::formula::{util, Lit, Var};
use self::search::clause_db::ClauseDBSettings;
pub use self::search::conflict::CCMinMode;
use self::search::decision_heuristic::DecisionHeuristicSettings;
pub use self::search::decision_heuristic::PhaseSaving;
use self::search::*;
use self::search::simplify::elim_clauses::*;
use self::search::simplify::*;
use self::budget::Budget;

pub mod budget;
mod search;


#[derive(Default)]
pub struct CoreSettings {
    pub heur: DecisionHeuristicSettings,
    pub db: ClauseDBSettings,
    pub ccmin_mode: CCMinMode,
    pub search: SearchSettings,
    pub core: SearcherSettings,
}

impl CoreSettings {
    fn validate(&self) -> SolverResult<()> {
        fn unit_interval(name: &'static str, value: f64) -> SolverResult<()> {
            if value > 0.0 && value < 1.0 {
                Ok(())
            } else {
                Err(SolverError::ParamOutOfRange { name, value: value.to_string() })
            }
        }

        unit_interval("var_decay", self.heur.var_decay)?;
        unit_interval("clause_decay", self.db.clause_decay)?;

        if self.heur.random_var_freq < 0.0 || self.heur.random_var_freq > 1.0 {
            return Err(SolverError::ParamOutOfRange {
                name: "random_var_freq",
                value: self.heur.random_var_freq.to_string(),
            });
        }

        if self.search.restart.margin <= 0.0 || self.search.restart.margin > 1.0 {
            return Err(SolverError::ParamOutOfRange {
                name: "restart_margin",
                value: self.search.restart.margin.to_string(),
            });
        }

        if self.search.restart.restart_interval == 0 {
            return Err(SolverError::ParamOutOfRange {
                name: "restart_interval",
                value: "0".to_string(),
            });
        }

        if self.search.reduce.keep_lbd == 0 {
            return Err(SolverError::ParamOutOfRange {
                name: "keep_lbd",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}


pub struct CoreSolver {
    ok: bool, // If FALSE, the constraints are already unsatisfiable. No part of the solver state may be used!
    ss: SearchSettings,
    search: Searcher,
}

impl Solver for CoreSolver {
    fn n_vars(&self) -> usize {
        self.search.number_of_vars()
    }

    fn n_clauses(&self) -> usize {
        self.search.number_of_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        self.search.new_var(upol, dvar)
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        if self.ok {
            if let AddClauseRes::UnSAT = self.search.add_clause(clause) {
                self.ok = false;
            }
        }
        self.ok
    }

    fn preprocess(&mut self, _: &Budget) -> bool {
        if self.ok {
            self.ok = self.search.preprocess();
        }
        self.ok
    }

    fn solve_limited(self, budget: &Budget, assumptions: &[Lit]) -> SolveRes<Self> {
        if self.ok {
            match self.search.search(&self.ss, budget, assumptions) {
                SearchRes::UnSAT(stats) => SolveRes::UnSAT(stats),

                SearchRes::SAT(assigns, stats) => {
                    let model = util::extract_model(&assigns);
                    SolveRes::SAT(model.iter().map(|(v, s)| v.sign_lit(!*s)).collect(), stats)
                }

                SearchRes::Interrupted(c, s) => SolveRes::Interrupted(
                    c,
                    CoreSolver {
                        ok: true,
                        ss: self.ss,
                        search: s,
                    },
                ),
            }
        } else {
            SolveRes::UnSAT(self.search.stats())
        }
    }

    fn stats(&self) -> Stats {
        self.search.stats()
    }
}

impl CoreSolver {
    /// Variable 0 is reserved at construction and pinned true, so literal 0
    /// is true and literal 1 is false for every solver instance, matching
    /// the encoding's own "always true"/"always false" literals.
    pub fn new(settings: CoreSettings) -> Self {
        let mut core = CoreSolver {
            ok: true,
            ss: settings.search,
            search: Searcher::new(
                settings.core,
                settings.db,
                settings.heur,
                settings.ccmin_mode,
            ),
        };

        let reserved = core.search.new_var(None, false);
        debug_assert_eq!(reserved.idx(), 0);
        match core.search.add_clause(&[reserved.pos_lit()]) {
            AddClauseRes::UnSAT => unreachable!("reserved literal can't conflict on an empty formula"),
            _ => {}
        }

        core
    }

    /// Like `new`, but rejects settings whose tunables fall outside the
    /// ranges §6 allows instead of silently running with a nonsensical
    /// value.
    pub fn try_new(settings: CoreSettings) -> SolverResult<Self> {
        settings.validate()?;
        Ok(Self::new(settings))
    }

    fn check_var(&self, v: Var) -> SolverResult<()> {
        if (v.idx() as usize) < self.n_vars() {
            Ok(())
        } else {
            Err(SolverError::VarOutOfRange { var: v.idx(), n_vars: self.n_vars() })
        }
    }

    /// Like `add_clause`, but rejects clauses mentioning a variable the
    /// solver hasn't been told about yet instead of silently treating it
    /// as fresh state corruption.
    pub fn try_add_clause(&mut self, ps: &[Lit]) -> SolverResult<bool> {
        if !self.ok {
            return Err(SolverError::WrongState { expected: "satisfiable or undetermined" });
        }
        for &lit in ps {
            self.check_var(lit.var())?;
        }
        Ok(self.add_clause(ps))
    }
}


pub struct SimpSettings {
    pub core: CoreSettings,
    pub simp: SimplificatorSettings,
    pub extend_model: bool, // Flag to indicate whether the user needs to look at the full model.
}

impl Default for SimpSettings {
    fn default() -> Self {
        SimpSettings {
            core: Default::default(),
            simp: Default::default(),
            extend_model: true,
        }
    }
}


pub struct SimpSolver {
    core: CoreSolver,
    elimclauses: ElimClauses,
    simp: Option<Simplificator>,
}

impl Solver for SimpSolver {
    fn n_vars(&self) -> usize {
        self.core.n_vars()
    }

    fn n_clauses(&self) -> usize {
        self.core.n_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.core.new_var(upol, dvar);
        if let Some(ref mut simp) = self.simp {
            simp.init_var(v);
        }
        v
    }

    fn add_clause(&mut self, ps: &[Lit]) -> bool {
        match self.simp {
            None => self.core.add_clause(ps),
            Some(ref mut simp) => {
                let ok = simp.add_clause(&mut self.core.search, ps);
                if !ok {
                    self.core.ok = false;
                }
                ok
            }
        }
    }

    fn preprocess(&mut self, budget: &Budget) -> bool {
        if !self.core.preprocess(budget) {
            return false;
        }

        let turn_off_elim = true;
        let result =
            if let Some(ref mut simp) = self.simp {
                let ok = simp.eliminate(&mut self.core.search, budget, &mut self.elimclauses);
                if !ok {
                    self.core.ok = false;
                }
                ok
            } else {
                return true;
            };

        if turn_off_elim {
            self.simp_off();
        }

        self.elimclauses.log_size();
        result
    }

    fn solve_limited(mut self, budget: &Budget, assumptions: &[Lit]) -> SolveRes<Self> {
        match self.simp {
            Some(mut simp) => {
                match simp.solve_limited(
                    self.core.search,
                    &self.core.ss,
                    budget,
                    &mut self.elimclauses,
                    assumptions,
                ) {
                    SearchRes::UnSAT(stats) => SolveRes::UnSAT(stats),

                    SearchRes::SAT(assigns, stats) => {
                        let mut model = util::extract_model(&assigns);
                        self.elimclauses.extend_model(&mut model);
                        SolveRes::SAT(model.iter().map(|(v, s)| v.sign_lit(!*s)).collect(), stats)
                    }

                    SearchRes::Interrupted(c, s) => {
                        // TODO:
                        //        if turn_off_simp {
                        //            self.simp_off();
                        //        }
                        SolveRes::Interrupted(
                            c,
                            SimpSolver {
                                core: CoreSolver {
                                    ok: true,
                                    ss: self.core.ss,
                                    search: s,
                                },
                                elimclauses: self.elimclauses,
                                simp: Some(simp),
                            },
                        )
                    }
                }
            }

            _ => match self.core.search.search(&self.core.ss, budget, assumptions) {
                SearchRes::UnSAT(stats) => SolveRes::UnSAT(stats),

                SearchRes::SAT(assigns, stats) => {
                    let mut model = util::extract_model(&assigns);
                    self.elimclauses.extend_model(&mut model);
                    SolveRes::SAT(model.iter().map(|(v, s)| v.sign_lit(!*s)).collect(), stats)
                }

                SearchRes::Interrupted(c, s) => SolveRes::Interrupted(
                    c,
                    SimpSolver {
                        core: CoreSolver {
                            ok: true,
                            ss: self.core.ss,
                            search: s,
                        },
                        elimclauses: self.elimclauses,
                        simp: None,
                    },
                ),
            },
        }
    }

    fn stats(&self) -> Stats {
        self.core.search.stats()
    }
}

impl SimpSolver {
    pub fn new(settings: SimpSettings) -> Self {
        let mut core = CoreSolver::new(settings.core);
        Simplificator::on(&mut core.search);
        SimpSolver {
            core,
            elimclauses: ElimClauses::new(settings.extend_model),
            simp: Some(Simplificator::new(settings.simp)),
        }
    }

    /// Like `new`, but rejects settings whose tunables fall outside the
    /// ranges §6 allows instead of silently running with a nonsensical
    /// value.
    pub fn try_new(settings: SimpSettings) -> SolverResult<Self> {
        settings.core.validate()?;
        if settings.simp.simp_garbage_frac <= 0.0 || settings.simp.simp_garbage_frac > 1.0 {
            return Err(SolverError::ParamOutOfRange {
                name: "simp_garbage_frac",
                value: settings.simp.simp_garbage_frac.to_string(),
            });
        }
        Ok(Self::new(settings))
    }

    fn simp_off(&mut self) {
        if let Some(_) = self.simp {
            Simplificator::off(&mut self.core.search);
            self.simp = None;
        }
    }

    /// Like `add_clause`, but rejects clauses mentioning a variable the
    /// solver hasn't been told about yet instead of silently treating it
    /// as fresh state corruption.
    pub fn try_add_clause(&mut self, ps: &[Lit]) -> SolverResult<bool> {
        if !self.core.ok {
            return Err(SolverError::WrongState { expected: "satisfiable or undetermined" });
        }
        for &lit in ps {
            let v = lit.var();
            if v.idx() as usize >= self.n_vars() {
                return Err(SolverError::VarOutOfRange { var: v.idx(), n_vars: self.n_vars() });
            }
        }
        Ok(self.add_clause(ps))
    }
}
