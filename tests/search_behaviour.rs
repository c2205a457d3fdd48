//! Long-running search behaviour: restarts and conflict accounting.

use std::cell::Cell;
use std::rc::Rc;

use marrow_solver::theory::EmptyTheory;
use marrow_solver::CdclSolver;
use marrow_solver::Indefinite;
use marrow_solver::SatisfactionResult;
use marrow_solver::SolverOptions;

type SatSolver = CdclSolver<EmptyTheory<i32>>;

fn pigeonhole(pigeons: i32, holes: i32) -> Vec<Vec<i32>> {
    let var = |pigeon: i32, hole: i32| (pigeon - 1) * holes + hole;
    let mut cnf: Vec<Vec<i32>> = vec![];
    for pigeon in 1..=pigeons {
        cnf.push((1..=holes).map(|hole| var(pigeon, hole)).collect());
    }
    for hole in 1..=holes {
        for first in 1..=pigeons {
            for second in (first + 1)..=pigeons {
                cnf.push(vec![-var(first, hole), -var(second, hole)]);
            }
        }
    }
    cnf
}

#[test]
fn hard_instances_restart_and_count_every_conflict() {
    let observed_conflicts = Rc::new(Cell::new(0u64));
    let observer = Rc::clone(&observed_conflicts);

    let options = SolverOptions {
        on_conflict: Some(Box::new(move |_conflict| {
            observer.set(observer.get() + 1);
        })),
        ..Default::default()
    };
    let mut solver = SatSolver::new(EmptyTheory::default(), options);
    solver.assume(pigeonhole(8, 7), ()).unwrap();

    assert!(matches!(
        solver.solve(&mut Indefinite),
        SatisfactionResult::Unsatisfiable(_)
    ));

    let counters = *solver.counters();
    // The first restart fires after 100 conflicts; this instance needs far
    // more than that.
    assert!(counters.num_conflicts > 100);
    assert!(counters.num_restarts >= 1);
    assert_eq!(solver.num_restarts(), counters.num_restarts);
    // Restarts do not reset the conflict count.
    assert_eq!(counters.num_conflicts, observed_conflicts.get());
    assert!(counters.num_decisions > 0);
    assert!(counters.num_propagations > 0);
}

#[test]
fn minimisation_removes_literals_on_structured_instances() {
    let mut solver = SatSolver::default();
    solver.assume(pigeonhole(6, 5), ()).unwrap();

    assert!(matches!(
        solver.solve(&mut Indefinite),
        SatisfactionResult::Unsatisfiable(_)
    ));
    assert!(solver.counters().num_minimised_away > 0);
}

#[test]
fn a_search_with_many_conflicts_still_finds_a_model_when_one_exists() {
    // Seven pigeons in seven holes: satisfiable, but only through a perfect
    // matching, so the search passes through plenty of conflicts first.
    let cnf = pigeonhole(7, 7);
    let mut solver = SatSolver::default();
    solver.assume(cnf.clone(), ()).unwrap();
    let literal_clauses: Vec<Vec<_>> = cnf
        .iter()
        .map(|clause| {
            clause
                .iter()
                .map(|formula| solver.intern_formula(formula))
                .collect()
        })
        .collect();

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Satisfiable(satisfiable) => {
            for clause in &literal_clauses {
                assert!(clause.iter().any(|literal| satisfiable.value(*literal)));
            }
        }
        _ => panic!("expected a satisfiable result"),
    }
}
