use cdcl_core::{Budget, CoreSettings, CoreSolver, SimpSettings, SimpSolver, SolveRes, Solver, Var};

fn vars(solver: &mut impl Solver, n: usize) -> Vec<Var> {
    (0..n).map(|_| solver.new_var(None, true)).collect()
}

fn lit(vs: &[Var], i: usize, sign: bool) -> cdcl_core::Lit {
    vs[i - 1].sign_lit(sign)
}

#[test]
fn unit_propagation_chain_is_sat() {
    let mut solver = CoreSolver::new(CoreSettings::default());
    let v = vars(&mut solver, 4);

    assert!(solver.add_clause(&[lit(&v, 1, false)]));
    assert!(solver.add_clause(&[lit(&v, 1, true), lit(&v, 2, false)]));
    assert!(solver.add_clause(&[lit(&v, 2, true), lit(&v, 3, false)]));
    assert!(solver.add_clause(&[lit(&v, 3, true), lit(&v, 4, false)]));

    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::SAT(model, _) => {
            for i in 1..=4 {
                assert!(model.contains(&lit(&v, i, false)), "expected var {} true", i);
            }
        }
        _ => panic!("expected SAT"),
    }
}

#[test]
fn simple_contradiction_is_unsat() {
    let mut solver = CoreSolver::new(CoreSettings::default());
    let v = vars(&mut solver, 2);

    solver.add_clause(&[lit(&v, 1, false), lit(&v, 2, false)]);
    solver.add_clause(&[lit(&v, 1, false), lit(&v, 2, true)]);
    solver.add_clause(&[lit(&v, 1, true), lit(&v, 2, false)]);
    solver.add_clause(&[lit(&v, 1, true), lit(&v, 2, true)]);

    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::UnSAT(_) => {}
        _ => panic!("expected UNSAT"),
    }
}

#[test]
fn pigeonhole_3_into_2_is_unsat() {
    let mut solver = CoreSolver::new(CoreSettings::default());
    // p[i][j]: pigeon i (0..3) in hole j (0..2)
    let p: Vec<Vec<Var>> = (0..3).map(|_| vars(&mut solver, 2)).collect();

    // each pigeon in at least one hole
    for i in 0..3 {
        solver.add_clause(&[p[i][0].pos_lit(), p[i][1].pos_lit()]);
    }
    // no hole holds two pigeons
    for j in 0..2 {
        for i1 in 0..3 {
            for i2 in (i1 + 1)..3 {
                solver.add_clause(&[p[i1][j].neg_lit(), p[i2][j].neg_lit()]);
            }
        }
    }

    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::UnSAT(_) => {}
        _ => panic!("expected UNSAT"),
    }
}

#[test]
fn equivalence_chain_collapses_to_unsat() {
    let mut solver = CoreSolver::new(CoreSettings::default());
    let v = vars(&mut solver, 3);

    // 1 <-> 2, 2 <-> 3
    solver.add_clause(&[lit(&v, 1, true), lit(&v, 2, false)]);
    solver.add_clause(&[lit(&v, 1, false), lit(&v, 2, true)]);
    solver.add_clause(&[lit(&v, 2, true), lit(&v, 3, false)]);
    solver.add_clause(&[lit(&v, 2, false), lit(&v, 3, true)]);
    // not-1 or not-3, forcing 1 != 3 while the chain forces 1 == 3
    solver.add_clause(&[lit(&v, 1, true), lit(&v, 3, true)]);
    // pin 3 true
    solver.add_clause(&[lit(&v, 3, false)]);

    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::UnSAT(_) => {}
        _ => panic!("expected UNSAT"),
    }
}

#[test]
fn pure_literal_shortcut_is_sat() {
    let mut solver = SimpSolver::new(SimpSettings::default());
    let v = vars(&mut solver, 3);

    solver.add_clause(&[lit(&v, 1, false), lit(&v, 2, false)]);
    solver.add_clause(&[lit(&v, 2, true), lit(&v, 3, false)]);

    solver.preprocess(&Budget::new());
    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::SAT(model, _) => {
            assert!(model.contains(&lit(&v, 1, false)));
            assert!(model.contains(&lit(&v, 3, false)));
        }
        _ => panic!("expected SAT"),
    }
}

#[test]
fn variable_elimination_reconstructs_consistent_model() {
    let mut solver = SimpSolver::new(SimpSettings::default());
    let v = vars(&mut solver, 3);

    solver.add_clause(&[lit(&v, 1, false), lit(&v, 2, false)]);
    solver.add_clause(&[lit(&v, 1, true), lit(&v, 3, false)]);

    solver.preprocess(&Budget::new());
    match solver.solve_limited(&Budget::new(), &[]) {
        SolveRes::SAT(model, _) => {
            let has = |l: cdcl_core::Lit| model.contains(&l);
            let v1 = has(lit(&v, 1, false));
            let v2 = has(lit(&v, 2, false));
            let v3 = has(lit(&v, 3, false));
            assert!(v1 || v2, "clause {{1, 2}} must be satisfied");
            assert!(!v1 || v3, "clause {{-1, 3}} must be satisfied");
        }
        _ => panic!("expected SAT"),
    }
}

#[test]
fn add_clause_order_does_not_affect_status() {
    let mut forward = CoreSolver::new(CoreSettings::default());
    let v = vars(&mut forward, 2);
    forward.add_clause(&[lit(&v, 1, false), lit(&v, 2, false)]);
    forward.add_clause(&[lit(&v, 1, true), lit(&v, 2, true)]);

    let mut reversed = CoreSolver::new(CoreSettings::default());
    let w = vars(&mut reversed, 2);
    reversed.add_clause(&[lit(&w, 2, true), lit(&w, 1, true)]);
    reversed.add_clause(&[lit(&w, 2, false), lit(&w, 1, false)]);

    let forward_sat = matches!(forward.solve_limited(&Budget::new(), &[]), SolveRes::SAT(..));
    let reversed_sat = matches!(reversed.solve_limited(&Budget::new(), &[]), SolveRes::SAT(..));
    assert_eq!(forward_sat, reversed_sat);
}
