//! Exercises the theory bridge with small hand-written theories: buffered
//! propagations with lazy explanations, theory conflicts carrying lemmas,
//! decision hints, clause learning from the final check, and the push/pop
//! level discipline.

use marrow_solver::proof::ProofExpansion;
use marrow_solver::theory::Explanation;
use marrow_solver::theory::LiteralValue;
use marrow_solver::theory::Theory;
use marrow_solver::theory::TheoryActions;
use marrow_solver::CdclSolver;
use marrow_solver::Indefinite;
use marrow_solver::Literal;
use marrow_solver::SatisfactionResult;
use marrow_solver::SolverOptions;

/// Enforces that at most one of the member formulas is true. When a member
/// becomes true the others are propagated false with a lazy explanation whose
/// payload encodes the triggering literal.
#[derive(Debug)]
struct AtMostOne {
    members: Vec<i32>,
    current: Option<Literal>,
    state_stack: Vec<Option<Literal>>,
    num_pushes: usize,
    num_pops: usize,
    num_explanations: usize,
}

impl AtMostOne {
    fn new(members: Vec<i32>) -> Self {
        AtMostOne {
            members,
            current: None,
            state_stack: vec![],
            num_pushes: 0,
            num_pops: 0,
            num_explanations: 0,
        }
    }
}

impl Theory for AtMostOne {
    type Formula = i32;
    type Lemma = &'static str;

    fn push_level(&mut self) {
        self.num_pushes += 1;
        self.state_stack.push(self.current);
    }

    fn pop_levels(&mut self, num_levels: usize) {
        self.num_pops += num_levels;
        for _ in 0..num_levels {
            self.current = self.state_stack.pop().expect("pops are matched by pushes");
        }
    }

    fn partial_check(&mut self, actions: &mut TheoryActions<'_, i32, &'static str>) {
        let member_literals: Vec<Literal> = self
            .members
            .iter()
            .map(|member| actions.intern(member))
            .collect();
        let newly_assigned: Vec<(Literal, i32)> = actions.iter_assignments().collect();

        for (literal, _) in newly_assigned {
            let Some(index) = member_literals.iter().position(|m| *m == literal) else {
                continue;
            };
            match self.current {
                Some(existing) if existing != literal => {
                    actions.raise_conflict(vec![existing, literal], "at-most-one");
                    return;
                }
                Some(_) => {}
                None => {
                    self.current = Some(literal);
                    for (other_index, other) in member_literals.iter().enumerate() {
                        if other_index != index {
                            actions.propagate(
                                !*other,
                                Explanation::Lazy(literal.to_u32() as u64),
                            );
                        }
                    }
                }
            }
        }
    }

    fn explain_propagation(&mut self, code: u64) -> (Vec<Literal>, &'static str) {
        self.num_explanations += 1;
        (vec![Literal::u32_to_literal(code as u32)], "at-most-one")
    }
}

#[test]
fn lazy_theory_propagations_are_explained_during_conflict_analysis() {
    let theory = AtMostOne::new(vec![1, 2, 3]);
    let mut solver = CdclSolver::new(theory, SolverOptions::default());
    solver.add_clause(&[2, 3], "hypothesis").unwrap();

    let member = solver.intern_formula(&1);
    match solver.solve_under_assumptions(&[member], &mut Indefinite) {
        SatisfactionResult::Unsatisfiable(unsatisfiable) => {
            assert_eq!(unsatisfiable.core(), &[member]);
        }
        _ => panic!("expected an unsatisfiable result"),
    }
    // The deferred explanations were only forced once analysis needed them.
    assert!(solver.theory().num_explanations >= 1);
}

#[test]
fn theory_levels_follow_the_decision_levels() {
    let theory = AtMostOne::new(vec![1, 2]);
    let mut solver = CdclSolver::new(theory, SolverOptions::default());
    solver.add_clause(&[1, 2], "hypothesis").unwrap();
    solver.add_clause(&[3, 4], "hypothesis").unwrap();

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Satisfiable(_) => {}
        _ => panic!("expected a satisfiable result"),
    }
    let theory = solver.theory();
    assert_eq!(
        theory.num_pushes - theory.num_pops,
        solver.decision_level(),
        "push/pop calls must mirror the decision level stack"
    );
}

#[test]
fn theory_conflicts_at_the_root_refute_the_problem_with_a_lemma() {
    let theory = AtMostOne::new(vec![1, 2]);
    let mut solver = CdclSolver::new(theory, SolverOptions::default());
    solver.add_clause(&[1], "hypothesis").unwrap();
    solver.add_clause(&[2], "hypothesis").unwrap();

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Unsatisfiable(mut unsatisfiable) => {
            let mut proof = unsatisfiable.proof().unwrap();
            let core = proof.unsat_core();

            let lemmas: Vec<_> = core
                .iter()
                .filter(|node| matches!(proof.expand(**node).unwrap(), ProofExpansion::Lemma))
                .collect();
            assert_eq!(lemmas.len(), 1);
            assert_eq!(proof.lemma(*lemmas[0]), Some(&"at-most-one"));
        }
        _ => panic!("expected an unsatisfiable result"),
    }
}

/// Suggests branching on formula 2 as soon as formula 1 becomes true.
#[derive(Debug, Default)]
struct HintTheory {
    hinted: bool,
}

impl Theory for HintTheory {
    type Formula = i32;
    type Lemma = ();

    fn partial_check(&mut self, actions: &mut TheoryActions<'_, i32, ()>) {
        let sees_one = actions
            .iter_assignments()
            .any(|(_, formula)| formula == 1);
        if sees_one && !self.hinted {
            self.hinted = true;
            let suggestion = actions.intern(&2);
            actions.add_decision(suggestion);
        }
    }
}

#[test]
fn decision_hints_are_consumed_before_the_activity_heuristic() {
    let mut solver = CdclSolver::new(HintTheory::default(), SolverOptions::default());
    solver.add_clause(&[1], ()).unwrap();
    let hinted = solver.intern_formula(&2);

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Satisfiable(satisfiable) => {
            assert!(satisfiable.value(hinted));
            assert_eq!(satisfiable.value_level(hinted), 1);
        }
        _ => panic!("expected a satisfiable result"),
    }
}

/// Completes the model in the final check: whenever formula 1 is true it
/// demands formula 2 through a learned clause.
#[derive(Debug, Default)]
struct CompletionTheory;

impl Theory for CompletionTheory {
    type Formula = i32;
    type Lemma = &'static str;

    fn final_check(&mut self, actions: &mut TheoryActions<'_, i32, &'static str>) {
        if actions.value_of(&1) == LiteralValue::True
            && actions.value_of(&2) != LiteralValue::True
        {
            let one = actions.intern(&1);
            let two = actions.intern(&2);
            actions.add_clause(vec![!one, two], "completion", true);
        }
    }
}

#[test]
fn clauses_learned_in_the_final_check_complete_the_model() {
    let mut solver = CdclSolver::new(CompletionTheory, SolverOptions::default());
    solver.add_clause(&[1], "hypothesis").unwrap();

    match solver.solve(&mut Indefinite) {
        SatisfactionResult::Satisfiable(_) => {}
        _ => panic!("expected a satisfiable result"),
    }
    let completed = solver.intern_formula(&2);
    assert!(solver.value(completed).unwrap());
}
