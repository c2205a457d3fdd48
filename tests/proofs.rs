//! Resolution proof reconstruction and unsatisfiable cores.

use marrow_solver::proof::ProofError;
use marrow_solver::proof::ProofExpansion;
use marrow_solver::proof::ProofNodeKind;
use marrow_solver::theory::EmptyTheory;
use marrow_solver::CdclSolver;
use marrow_solver::Indefinite;
use marrow_solver::SatisfactionResult;
use marrow_solver::SolverOptions;

type SatSolver = CdclSolver<EmptyTheory<i32>>;

/// Clauses stating that each of `pigeons` pigeons sits in one of `holes`
/// holes, while no hole takes two pigeons.
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
fn the_refutation_root_is_the_empty_clause_and_rests_on_all_hypotheses() {
    let mut solver = SatSolver::default();
    solver.add_clause(&[1, 2], ()).unwrap();
    solver.add_clause(&[-1], ()).unwrap();
    let _ = solver.add_clause(&[-2], ());

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            let mut proof = unsatisfiable.proof().unwrap();
            assert!(proof.literals(proof.root()).is_empty());

            let core = proof.unsat_core();
            assert_eq!(core.len(), 3);
            for node in core {
                assert!(matches!(
                    proof.expand(node).unwrap(),
                    ProofExpansion::Hypothesis
                ));
            }
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}

#[test]
fn proof_queries_can_be_repeated() {
    let mut solver = SatSolver::default();
    solver.add_clause(&[1, 2], ()).unwrap();
    solver.add_clause(&[-1], ()).unwrap();
    let _ = solver.add_clause(&[-2], ());

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            let mut proof = unsatisfiable.proof().unwrap();
            // The visited marks are cleared between traversals.
            let first = proof.unsat_core();
            let second = proof.unsat_core();
            assert_eq!(first.len(), second.len());

            let leaves = proof.fold(0u32, |count, _, kind| {
                count + (kind == ProofNodeKind::Hypothesis) as u32
            });
            assert_eq!(leaves, 3);
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}

#[test]
fn pigeonhole_refutations_fold_over_every_leaf_exactly_once() {
    let mut solver = SatSolver::default();
    solver.assume(pigeonhole(3, 2), ()).unwrap();

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            let mut proof = unsatisfiable.proof().unwrap();
            let core = proof.unsat_core();
            assert!(!core.is_empty());

            let mut folded_leaves = vec![];
            let () = proof.fold((), |(), node, kind| {
                if kind != ProofNodeKind::Resolution {
                    folded_leaves.push(node);
                }
            });

            // Every leaf is seen exactly once, and the leaves are exactly the
            // unsatisfiable core.
            let mut deduplicated = folded_leaves.clone();
            deduplicated.sort_by_key(|node| node.id());
            deduplicated.dedup();
            assert_eq!(deduplicated.len(), folded_leaves.len());

            let mut core_sorted = core.clone();
            core_sorted.sort_by_key(|node| node.id());
            assert_eq!(core_sorted, deduplicated);
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}

#[test]
fn every_resolution_step_of_a_refutation_has_unique_pivots() {
    let mut solver = SatSolver::default();
    solver.assume(pigeonhole(3, 2), ()).unwrap();

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            let mut proof = unsatisfiable.proof().unwrap();
            let nodes = proof.fold(vec![], |mut nodes, node, _| {
                nodes.push(node);
                nodes
            });

            for node in nodes {
                match proof.expand(node).unwrap() {
                    ProofExpansion::HyperResolution { steps, .. } => {
                        assert!(!steps.is_empty());
                    }
                    ProofExpansion::Hypothesis
                    | ProofExpansion::Assumption
                    | ProofExpansion::Lemma
                    | ProofExpansion::Duplicate { .. } => {}
                }
            }
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}

#[test]
fn disabling_proof_storage_makes_proofs_unavailable() {
    let options = SolverOptions {
        store_proof: false,
        ..Default::default()
    };
    let mut solver = SatSolver::new(EmptyTheory::default(), options);
    solver.add_clause(&[1], ()).unwrap();
    let _ = solver.add_clause(&[-1], ());

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            assert!(matches!(unsatisfiable.proof(), Err(ProofError::NoProof)));
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}

#[test]
fn assumption_conflicts_carry_a_core_instead_of_a_proof() {
    let mut solver = SatSolver::default();
    solver.add_clause(&[1], ()).unwrap();
    let p = solver.intern_formula(&1);

    match solver.solve_under_assumptions(&[!p], &mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            assert_eq!(unsatisfiable.core(), &[!p]);
            assert!(matches!(unsatisfiable.proof(), Err(ProofError::NoProof)));
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}
