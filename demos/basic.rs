//! Minimal programmatic use of the `Solver` API: three variables, two
//! clauses, print the model or report unsatisfiability.

use cdcl_core::{Budget, CoreSettings, CoreSolver, SolveRes, Solver};

fn main() {
    env_logger::init();

    let mut solver = CoreSolver::new(CoreSettings::default());
    let a = solver.new_var(None, true);
    let b = solver.new_var(None, true);
    let c = solver.new_var(None, true);

    solver.add_clause(&[a.pos_lit(), b.pos_lit()]);
    solver.add_clause(&[b.neg_lit(), c.pos_lit()]);

    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::SAT(model, stats) => {
            println!("SAT");
            for lit in &model {
                print!("{}{:?} ", if lit.sign() { "-" } else { "" }, lit.var());
            }
            println!();
            println!("conflicts: {}", stats.conflicts);
        }
        SolveRes::UnSAT(_) => println!("UNSAT"),
        SolveRes::Interrupted(..) => println!("INDETERMINATE"),
    }
}
