#[macro_use]
extern crate log;

pub mod sat;

pub use crate::sat::engine::{CoreSettings, CoreSolver, SimpSettings, SimpSolver};
pub use crate::sat::engine::budget::Budget;
pub use crate::sat::error::{SolverError, SolverResult};
pub use crate::sat::formula::{Lit, Var};
pub use crate::sat::{SolveRes, Solver, Stats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_solver_solves_trivial_satisfiable_formula() {
        let mut solver = CoreSolver::new(CoreSettings::default());
        let x = solver.new_var(None, true);
        solver.add_clause(&[x.pos_lit()]);

        match solver.solve_limited(&Budget::new(), &[]) {
            SolveRes::SAT(model, _) => assert!(model.contains(&x.pos_lit())),
            _ => panic!("expected SAT"),
        }
    }

    #[test]
    fn core_solver_detects_trivial_unsat() {
        let mut solver = CoreSolver::new(CoreSettings::default());
        let x = solver.new_var(None, true);
        solver.add_clause(&[x.pos_lit()]);
        solver.add_clause(&[x.neg_lit()]);

        match solver.solve_limited(&Budget::new(), &[]) {
            SolveRes::UnSAT(_) => {}
            _ => panic!("expected UNSAT"),
        }
    }
}
