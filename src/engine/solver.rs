//! Houses the solver which decides satisfiability of a clause set modulo an
//! optional background theory, using conflict-driven clause learning.

use std::fmt::Debug;
use std::fmt::Formatter;

use log::debug;
use log::warn;

use super::assignments::Assignments;
use super::atom_store::AtomStore;
use super::clausal_propagator::ClausalPropagator;
use super::clause::Premise;
use super::clause_allocator::ClauseAllocator;
use super::conflict_analysis::atom_unit_proof;
use super::conflict_analysis::ConflictAnalysisContext;
use super::conflict_analysis::ResolutionAnalyser;
use super::counters::Counters;
use super::learned_clause_manager::LearnedClauseManager;
use super::learned_clause_manager::LearningOptions;
use super::reason::Reason;
use super::restart_strategy::RestartOptions;
use super::restart_strategy::RestartStrategy;
use super::termination::TerminationCondition;
use super::variable_selector::VariableSelector;
use crate::api::SatisfactionResult;
use crate::api::Satisfiable;
use crate::api::Unsatisfiable;
use crate::basic_types::ClauseReference;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::HashMap;
use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::marrow_assert_extreme;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;
use crate::proof::ProofError;
use crate::theory::Explanation;
use crate::theory::Theory;
use crate::theory::TheoryActions;
use crate::theory::TheoryQueue;

/// Requesting the value of a literal which has no value under the current
/// assignment.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("the literal has no value under the current assignment")]
pub struct UndecidedLiteral;

/// A hint for how large the problem is expected to be, used to pre-size the
/// clause storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverSize {
    Tiny,
    #[default]
    Small,
    Big,
}

impl SolverSize {
    fn clause_capacity(self) -> usize {
        match self {
            SolverSize::Tiny => 0,
            SolverSize::Small => 1 << 10,
            SolverSize::Big => 1 << 16,
        }
    }
}

/// Options for the [`CdclSolver`] which determine how it behaves.
pub struct SolverOptions {
    /// The expected problem size.
    pub size: SolverSize,
    /// The options used by the restart strategy.
    pub restart_options: RestartOptions,
    /// The options controlling clause learning and database reduction.
    pub learning_options: LearningOptions,
    /// Whether learned clause minimisation should take place.
    pub learning_clause_minimisation: bool,
    /// Whether clause premises are recorded so a resolution proof can be
    /// reconstructed on unsatisfiability.
    pub store_proof: bool,
    /// Threshold above which variable activities are rescaled.
    pub max_variable_activity: f64,
    /// Decay factor for variable activities.
    pub variable_activity_decay_factor: f64,
    /// Invoked with the conflicting clause whenever a conflict is found.
    pub on_conflict: Option<Box<dyn FnMut(&[Literal])>>,
    /// Invoked with every decision literal when it is enqueued.
    pub on_decision: Option<Box<dyn FnMut(Literal)>>,
    /// Invoked with the positive literal of every freshly interned atom.
    pub on_new_atom: Option<Box<dyn FnMut(Literal)>>,
}

impl Debug for SolverOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverOptions")
            .field("restart_options", &self.restart_options)
            .field("learning_options", &self.learning_options)
            .field(
                "learning_clause_minimisation",
                &self.learning_clause_minimisation,
            )
            .field("store_proof", &self.store_proof)
            .finish()
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            size: SolverSize::default(),
            restart_options: RestartOptions::default(),
            learning_options: LearningOptions::default(),
            learning_clause_minimisation: true,
            store_proof: true,
            max_variable_activity: 1e100,
            variable_activity_decay_factor: 0.95,
            on_conflict: None,
            on_decision: None,
            on_new_atom: None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum SolverState {
    Ready,
    Satisfiable,
    Infeasible { conflict: ClauseReference },
    InfeasibleUnderAssumptions { core: Vec<Literal> },
}

enum SolveFlag {
    Satisfiable,
    Infeasible,
    InfeasibleUnderAssumptions,
    Unknown,
}

enum NextDecision {
    Enqueued,
    Satisfiable,
    InfeasibleUnderAssumptions(Vec<Literal>),
    TheoryConflict(ClauseReference),
    TheoryProgress,
}

/// A satisfiability solver based on conflict-driven clause learning, extended
/// with a background theory (CDCL(T)).
///
/// Atomic formulas are opaque values supplied by the host and are interned
/// into literals. The solver alternates unit propagation, theory checks and
/// branching; conflicts are analysed with 1UIP resolution (see \[1\]) and the
/// learnt clauses steer the search away from the conflicting region. The
/// theory interaction follows the lazy-SMT architecture described in \[2\].
///
/// # Bibliography
/// \[1\] J. Marques-Silva, I. Lynce, and S. Malik, ‘Conflict-driven clause
/// learning SAT solvers’, in Handbook of Satisfiability, IOS press, 2021.
///
/// \[2\] R. Sebastiani, ‘Lazy satisfiability modulo theories’, Journal on
/// Satisfiability, Boolean Modeling and Computation, vol. 3, 2007.
pub struct CdclSolver<Th: Theory> {
    /// The solver continuously changes states during the search; the state
    /// also carries the certificate of the last outcome.
    pub(crate) state: SolverState,
    theory: Th,
    pub(crate) atoms: AtomStore<Th::Formula>,
    pub(crate) assignments: Assignments,
    /// Responsible for clausal propagation based on the two-watched scheme.
    clausal_propagator: ClausalPropagator,
    /// Tracks information about all allocated clauses. All clause allocation
    /// goes exclusively through the clause allocator.
    pub(crate) clause_allocator: ClauseAllocator<Th::Lemma>,
    /// Tracks the learned clauses which may be deleted again.
    learned_clause_manager: LearnedClauseManager,
    /// Tracks information about the restarts. Occasionally the solver will
    /// undo all its decisions and restart the search from the root; learned
    /// clauses and activities are kept.
    restart_strategy: RestartStrategy,
    variable_selector: VariableSelector,
    /// Performs conflict analysis, minimisation, and core extraction.
    conflict_analyser: ResolutionAnalyser,
    /// Holds the assumptions when the solver is queried to solve under
    /// assumptions.
    assumptions: Vec<Literal>,
    /// The buffered effects of theory checks.
    theory_queue: TheoryQueue<Th::Lemma>,
    /// The next trail position the theory has not seen yet.
    theory_head: usize,
    num_hypothesis_clauses: usize,
    /// The current learned clause limit; grows on every restart.
    learned_clause_limit: f64,
    /// Memoised unit proofs of root assignments, keyed by variable.
    unit_proof_cache: HashMap<Variable, ClauseReference>,
    /// The materialised empty clause of a refutation, built on demand.
    refutation: Option<ClauseReference>,
    counters: Counters,
    options: SolverOptions,
}

impl<Th: Theory + Default> Default for CdclSolver<Th> {
    fn default() -> Self {
        CdclSolver::new(Th::default(), SolverOptions::default())
    }
}

impl<Th: Theory> Debug for CdclSolver<Th> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdclSolver")
            .field("state", &self.state)
            .field("assumptions", &self.assumptions)
            .field("counters", &self.counters)
            .field("options", &self.options)
            .finish()
    }
}

// Construction and clause/atom intake.
impl<Th: Theory> CdclSolver<Th> {
    pub fn new(theory: Th, options: SolverOptions) -> Self {
        CdclSolver {
            state: SolverState::Ready,
            theory,
            atoms: AtomStore::default(),
            assignments: Assignments::default(),
            clausal_propagator: ClausalPropagator::default(),
            clause_allocator: ClauseAllocator::with_capacity(options.size.clause_capacity()),
            learned_clause_manager: LearnedClauseManager::new(options.learning_options),
            restart_strategy: RestartStrategy::new(options.restart_options),
            variable_selector: VariableSelector::new(
                options.max_variable_activity,
                options.variable_activity_decay_factor,
            ),
            conflict_analyser: ResolutionAnalyser::default(),
            assumptions: Vec::default(),
            theory_queue: TheoryQueue::default(),
            theory_head: 0,
            num_hypothesis_clauses: 0,
            learned_clause_limit: 0.0,
            unit_proof_cache: HashMap::default(),
            refutation: None,
            counters: Counters::default(),
            options,
        }
    }

    /// Interns a formula, allocating a fresh variable for its canonical form
    /// on first sight. Interning never propagates.
    pub fn intern_formula(&mut self, formula: &Th::Formula) -> Literal {
        let literal = self.atoms.intern(formula);
        self.synchronise_atom_structures();
        literal
    }

    /// Grows every per-variable structure to cover atoms interned since the
    /// last call (interning may also happen inside theory checks).
    fn synchronise_atom_structures(&mut self) {
        while self.assignments.num_variables() < self.atoms.num_variables() {
            self.assignments.grow();
            self.clausal_propagator.grow();
            self.variable_selector.grow();
            let variable = Variable::new(self.assignments.num_variables() - 1);
            if let Some(callback) = &mut self.options.on_new_atom {
                callback(Literal::new(variable, true));
            }
        }
    }

    /// Sets the sign the branching heuristic uses when it decides on this
    /// variable. Freshly interned variables default to the negative phase.
    pub fn set_default_polarity(&mut self, variable: Variable, polarity: bool) {
        self.variable_selector.set_default_polarity(variable, polarity);
    }

    /// Adds permanent hypothesis clauses given in conjunctive normal form.
    pub fn assume(
        &mut self,
        cnf: Vec<Vec<Th::Formula>>,
        lemma: Th::Lemma,
    ) -> Result<(), ConstraintOperationError> {
        for clause in cnf {
            self.add_clause(&clause, lemma.clone())?;
        }
        Ok(())
    }

    /// Adds a single permanent clause over formulas. An immediate root-level
    /// inconsistency puts the solver in an infeasible state.
    pub fn add_clause(
        &mut self,
        formulas: &[Th::Formula],
        lemma: Th::Lemma,
    ) -> Result<(), ConstraintOperationError> {
        let literals = formulas
            .iter()
            .map(|formula| self.intern_formula(formula))
            .collect();
        self.add_clause_literals(literals, lemma)
    }

    /// Adds a single permanent clause over already-interned literals.
    pub fn add_clause_literals(
        &mut self,
        literals: Vec<Literal>,
        lemma: Th::Lemma,
    ) -> Result<(), ConstraintOperationError> {
        if matches!(self.state, SolverState::Infeasible { .. }) {
            return Err(ConstraintOperationError::InfeasibleState);
        }
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        self.state = SolverState::Ready;

        if literals.is_empty() {
            warn!("Adding an empty clause, unusual!");
        }

        let premise = if self.options.store_proof {
            Premise::Hypothesis(lemma)
        } else {
            Premise::Untracked
        };
        self.num_hypothesis_clauses += 1;

        let addition = self.add_clause_internal(literals, premise, false);
        let conflict = match addition {
            Err(conflict) => Some(conflict),
            Ok(_) => self
                .clausal_propagator
                .propagate(&mut self.assignments, &mut self.clause_allocator)
                .err(),
        };
        if let Some(conflict) = conflict {
            self.state = SolverState::Infeasible { conflict };
            return Err(ConstraintOperationError::InfeasibleClause);
        }
        Ok(())
    }

    /// Stores a clause and hooks it into propagation, at any decision level.
    /// An asserting clause enqueues its remaining literal; a falsified clause
    /// is returned as a conflict.
    fn add_clause_internal(
        &mut self,
        mut literals: Vec<Literal>,
        premise: Premise<Th::Lemma>,
        is_removable: bool,
    ) -> Result<Option<ClauseReference>, ClauseReference> {
        if literals.is_empty() {
            let reference = self
                .clause_allocator
                .create_clause(literals, is_removable, premise);
            return Err(reference);
        }

        // Watch candidates first: non-false literals, then false literals by
        // descending assignment level, so any backtrack which touches the
        // clause unassigns a watch.
        let current_level = self.assignments.get_decision_level();
        let assignments = &self.assignments;
        literals.sort_by_key(|literal| {
            if !assignments.is_literal_assigned_false(*literal) {
                0
            } else {
                1 + current_level - assignments.get_literal_assignment_level(*literal)
            }
        });

        if literals.len() == 1 {
            let literal = literals[0];
            let reference = self
                .clause_allocator
                .create_clause(literals, is_removable, premise);
            if self.assignments.is_literal_assigned_true(literal) {
                // The fact now holds at the root regardless of the level it
                // was derived at.
                if self.assignments.get_literal_assignment_level(literal) > 0 {
                    self.assignments
                        .promote_to_root(literal.variable(), Reason::Clause(reference));
                }
            } else if self.assignments.is_literal_unassigned(literal) {
                self.assignments
                    .enqueue(literal, 0, Reason::Clause(reference));
            } else {
                return Err(reference);
            }
            return Ok(Some(reference));
        }

        let first_watch = literals[0];
        let second_watch = literals[1];
        let reference = self
            .clause_allocator
            .create_clause(literals, is_removable, premise);
        self.clausal_propagator
            .attach_clause(reference, &mut self.clause_allocator);

        if self.assignments.is_literal_assigned_false(second_watch) {
            if self.assignments.is_literal_assigned_false(first_watch) {
                return Err(reference);
            }
            if self.assignments.is_literal_unassigned(first_watch) {
                self.assignments
                    .enqueue(first_watch, current_level, Reason::Clause(reference));
            }
        }
        Ok(Some(reference))
    }
}

// The search loop.
impl<Th: Theory> CdclSolver<Th> {
    pub fn solve<'this>(
        &'this mut self,
        termination: &mut impl TerminationCondition,
    ) -> SatisfactionResult<'this, Th> {
        self.solve_under_assumptions(&[], termination)
    }

    /// Solves under the given assumption literals, which are forced as
    /// pseudo-decisions for the duration of this call.
    pub fn solve_under_assumptions<'this>(
        &'this mut self,
        assumptions: &[Literal],
        termination: &mut impl TerminationCondition,
    ) -> SatisfactionResult<'this, Th> {
        if matches!(self.state, SolverState::Infeasible { .. }) {
            return SatisfactionResult::Unsatisfiable(Unsatisfiable::new(self));
        }

        self.initialise(assumptions);
        match self.solve_internal(termination) {
            SolveFlag::Satisfiable => SatisfactionResult::Satisfiable(Satisfiable::new(self)),
            SolveFlag::Infeasible | SolveFlag::InfeasibleUnderAssumptions => {
                SatisfactionResult::Unsatisfiable(Unsatisfiable::new(self))
            }
            SolveFlag::Unknown => {
                self.state = SolverState::Ready;
                SatisfactionResult::Unknown
            }
        }
    }

    fn initialise(&mut self, assumptions: &[Literal]) {
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        self.state = SolverState::Ready;
        assumptions.clone_into(&mut self.assumptions);
        self.learned_clause_limit = self.num_hypothesis_clauses as f64
            * self.options.learning_options.initial_limit_ratio;
    }

    fn solve_internal(&mut self, termination: &mut impl TerminationCondition) -> SolveFlag {
        loop {
            if termination.should_stop() {
                debug!("Terminated before reaching a conclusion");
                return SolveFlag::Unknown;
            }

            let mut conflict = self.propagate_enqueued();

            if conflict.is_none() {
                marrow_assert_moderate!(self
                    .clausal_propagator
                    .is_propagation_complete(self.assignments.num_trail_entries()));
                marrow_assert_extreme!(self
                    .clausal_propagator
                    .debug_check_watchers(&self.clause_allocator));

                if self.restart_strategy.should_restart()
                    && self.assignments.get_decision_level() > self.assumptions.len()
                {
                    self.restart();
                    continue;
                }

                let num_learned = self.learned_clause_manager.num_learned_clauses();
                if num_learned as f64 - self.assignments.num_trail_entries() as f64
                    > self.learned_clause_limit
                {
                    self.learned_clause_manager.reduce_database(
                        num_learned / 2,
                        &mut self.clause_allocator,
                        &self.assignments,
                    );
                }

                match self.enqueue_next_decision() {
                    NextDecision::Enqueued | NextDecision::TheoryProgress => continue,
                    NextDecision::Satisfiable => {
                        self.state = SolverState::Satisfiable;
                        return SolveFlag::Satisfiable;
                    }
                    NextDecision::InfeasibleUnderAssumptions(core) => {
                        self.state = SolverState::InfeasibleUnderAssumptions { core };
                        return SolveFlag::InfeasibleUnderAssumptions;
                    }
                    NextDecision::TheoryConflict(reference) => conflict = Some(reference),
                }
            }

            if let Some(conflict) = conflict {
                self.counters.num_conflicts += 1;
                self.restart_strategy.notify_conflict();
                if let Some(callback) = &mut self.options.on_conflict {
                    callback(self.clause_allocator[conflict].get_literal_slice());
                }

                let conflict_level = self.clause_allocator[conflict]
                    .get_literal_slice()
                    .iter()
                    .map(|literal| self.assignments.get_literal_assignment_level(*literal))
                    .max()
                    .unwrap_or(0);
                if self.assignments.is_at_the_root_level() || conflict_level == 0 {
                    self.state = SolverState::Infeasible { conflict };
                    return SolveFlag::Infeasible;
                }

                self.resolve_conflict(conflict);
                self.variable_selector.decay_activities();
                self.learned_clause_manager.decay_clause_activities();
            }
        }
    }

    /// Main propagation loop: clausal propagation to fixpoint, interleaved
    /// with theory checks over the newly assigned trail slice.
    fn propagate_enqueued(&mut self) -> Option<ClauseReference> {
        let num_assigned_old = self.assignments.num_trail_entries();

        let result = loop {
            if let Err(conflict) = self
                .clausal_propagator
                .propagate(&mut self.assignments, &mut self.clause_allocator)
            {
                break Some(conflict);
            }

            if !self.theory.has_theory() {
                break None;
            }
            let trail_len = self.assignments.num_trail_entries();
            if self.theory_head == trail_len {
                break None;
            }
            marrow_assert_simple!(self.theory_head < trail_len);

            let slice_start = self.theory_head;
            self.theory_head = trail_len;
            {
                let mut actions = TheoryActions {
                    atoms: &mut self.atoms,
                    assignments: &self.assignments,
                    slice_start,
                    slice_end: trail_len,
                    queue: &mut self.theory_queue,
                };
                self.theory.partial_check(&mut actions);
            }
            self.synchronise_atom_structures();

            if let Some(conflict) = self.process_theory_queue() {
                break Some(conflict);
            }
        };

        self.counters.num_propagations +=
            (self.assignments.num_trail_entries() - num_assigned_old) as u64;
        result
    }

    /// Applies the buffered effects of a theory check in emission order. A
    /// raised conflict wins over everything else.
    fn process_theory_queue(&mut self) -> Option<ClauseReference> {
        if let Some((literals, lemma)) = self.theory_queue.conflict.take() {
            self.theory_queue.propagations.clear();
            self.theory_queue.clauses_to_add.clear();
            marrow_assert_moderate!(literals
                .iter()
                .all(|literal| self.assignments.is_literal_assigned_true(*literal)));
            let clause: Vec<Literal> = literals.iter().map(|literal| !*literal).collect();
            let premise = if self.options.store_proof {
                Premise::Lemma(lemma)
            } else {
                Premise::Untracked
            };
            let reference = self.clause_allocator.create_clause(clause, true, premise);
            return Some(reference);
        }

        let clauses = std::mem::take(&mut self.theory_queue.clauses_to_add);
        for (literals, lemma, keep) in clauses {
            let premise = if self.options.store_proof {
                Premise::Lemma(lemma)
            } else {
                Premise::Untracked
            };
            if let Err(conflict) = self.add_clause_internal(literals, premise, !keep) {
                self.theory_queue.propagations.clear();
                return Some(conflict);
            }
        }

        let propagations = std::mem::take(&mut self.theory_queue.propagations);
        for (literal, explanation) in propagations {
            if self.assignments.is_literal_assigned_true(literal) {
                continue;
            }
            if self.assignments.is_literal_assigned_false(literal) {
                // The propagated literal is already false: materialise the
                // explanation and treat it as a theory conflict.
                let (antecedents, lemma) = match explanation {
                    Explanation::Eager { antecedents, lemma } => (antecedents, lemma),
                    Explanation::Lazy(code) => self.theory.explain_propagation(code),
                };
                let mut clause = Vec::with_capacity(antecedents.len() + 1);
                clause.push(literal);
                clause.extend(antecedents.into_iter().map(|antecedent| !antecedent));
                let premise = if self.options.store_proof {
                    Premise::Lemma(lemma)
                } else {
                    Premise::Untracked
                };
                let reference = self.clause_allocator.create_clause(clause, true, premise);
                return Some(reference);
            }

            let level = self.assignments.get_decision_level();
            let reason = match explanation {
                Explanation::Eager { antecedents, lemma } => {
                    let mut clause = Vec::with_capacity(antecedents.len() + 1);
                    clause.push(literal);
                    clause.extend(antecedents.into_iter().map(|antecedent| !antecedent));
                    let premise = if self.options.store_proof {
                        Premise::Lemma(lemma)
                    } else {
                        Premise::Untracked
                    };
                    Reason::Clause(self.clause_allocator.create_clause(clause, true, premise))
                }
                Explanation::Lazy(code) => Reason::TheoryLazy(code),
            };
            self.assignments.enqueue(literal, level, reason);
        }

        None
    }

    fn enqueue_next_decision(&mut self) -> NextDecision {
        // Theory-suggested decisions take priority.
        if let Some(hint) = self.pop_decision_hint() {
            self.declare_new_decision_level();
            self.counters.num_decisions += 1;
            if let Some(callback) = &mut self.options.on_decision {
                callback(hint);
            }
            self.assignments.enqueue_decision_literal(hint);
            return NextDecision::Enqueued;
        }

        // By convention the i-th assumption is forced at decision level i + 1.
        if self.assignments.get_decision_level() < self.assumptions.len() {
            let assumption = self.assumptions[self.assignments.get_decision_level()];
            self.declare_new_decision_level();
            return if self.assignments.is_literal_assigned_true(assumption) {
                // Already implied at an earlier level; the fresh level stays
                // empty to preserve the alignment above.
                NextDecision::Enqueued
            } else if self.assignments.is_literal_assigned_false(assumption) {
                let core = self.compute_assumption_core(assumption);
                NextDecision::InfeasibleUnderAssumptions(core)
            } else {
                self.assignments.enqueue_decision_literal(assumption);
                NextDecision::Enqueued
            };
        }

        match self.variable_selector.next_decision(&self.assignments) {
            Some(literal) => {
                self.declare_new_decision_level();
                self.counters.num_decisions += 1;
                if let Some(callback) = &mut self.options.on_decision {
                    callback(literal);
                }
                self.assignments.enqueue_decision_literal(literal);
                NextDecision::Enqueued
            }
            None => self.run_final_check(),
        }
    }

    fn pop_decision_hint(&mut self) -> Option<Literal> {
        while !self.theory_queue.next_decisions.is_empty() {
            let hint = self.theory_queue.next_decisions.remove(0);
            if self.assignments.is_literal_unassigned(hint) {
                return Some(hint);
            }
        }
        None
    }

    /// Invoked on a total Boolean assignment with no pending theory work. The
    /// search concludes with satisfiability only if the theory stays quiet.
    fn run_final_check(&mut self) -> NextDecision {
        if !self.theory.has_theory() {
            return NextDecision::Satisfiable;
        }

        let trail_len = self.assignments.num_trail_entries();
        let num_clauses_before = self.clause_allocator.num_clauses();
        let num_atoms_before = self.atoms.num_variables();
        {
            let mut actions = TheoryActions {
                atoms: &mut self.atoms,
                assignments: &self.assignments,
                slice_start: 0,
                slice_end: trail_len,
                queue: &mut self.theory_queue,
            };
            self.theory.final_check(&mut actions);
        }
        self.synchronise_atom_structures();

        if let Some(conflict) = self.process_theory_queue() {
            return NextDecision::TheoryConflict(conflict);
        }

        let made_progress = self.assignments.num_trail_entries() != trail_len
            || self.clause_allocator.num_clauses() != num_clauses_before
            || self.atoms.num_variables() != num_atoms_before
            || !self.theory_queue.next_decisions.is_empty();
        if made_progress {
            NextDecision::TheoryProgress
        } else {
            NextDecision::Satisfiable
        }
    }

    fn declare_new_decision_level(&mut self) {
        self.assignments.increase_decision_level();
        if self.theory.has_theory() {
            self.theory.push_level();
        }
    }

    pub(crate) fn backtrack(&mut self, backtrack_level: usize) {
        marrow_assert_simple!(backtrack_level < self.assignments.get_decision_level());
        let num_popped_levels = self.assignments.get_decision_level() - backtrack_level;

        let unassigned = self.assignments.synchronise(backtrack_level);
        for literal in unassigned {
            self.variable_selector.restore(literal.variable());
        }

        self.clausal_propagator
            .synchronise(self.assignments.num_trail_entries());
        self.theory_head = self
            .theory_head
            .min(self.assignments.num_trail_entries());

        if self.theory.has_theory() {
            self.theory.pop_levels(num_popped_levels);
        }
    }

    fn restart(&mut self) {
        debug!(
            "Restarting after {} conflicts",
            self.counters.num_conflicts
        );
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        self.restart_strategy.notify_restart();
        self.counters.num_restarts += 1;
        self.learned_clause_limit *= self.options.learning_options.limit_growth_factor;
    }

    /// Performs conflict analysis, backtracks, and records the learnt clause;
    /// its asserting literal is enqueued at the backjump level.
    fn resolve_conflict(&mut self, conflict: ClauseReference) {
        let result = {
            let mut context = ConflictAnalysisContext {
                assignments: &mut self.assignments,
                clause_allocator: &mut self.clause_allocator,
                learned_clause_manager: &mut self.learned_clause_manager,
                variable_selector: &mut self.variable_selector,
                counters: &mut self.counters,
                theory: &mut self.theory,
                unit_proof_cache: &mut self.unit_proof_cache,
                store_proof: self.options.store_proof,
                learning_clause_minimisation: self.options.learning_clause_minimisation,
            };
            self.conflict_analyser.compute_1uip(conflict, &mut context)
        };

        self.counters
            .average_learned_clause_length
            .add_term(result.learned_literals.len() as u64);
        self.counters
            .average_backtrack_amount
            .add_term((self.assignments.get_decision_level() - result.backjump_level) as u64);

        self.backtrack(result.backjump_level);

        let premise = if self.options.store_proof {
            Premise::History(result.history)
        } else {
            Premise::Untracked
        };
        let asserting_literal = result.learned_literals[0];
        let learned_length = result.learned_literals.len();

        if learned_length == 1 {
            let reference =
                self.clause_allocator
                    .create_clause(result.learned_literals, false, premise);
            self.counters.num_unit_clauses_learned += 1;
            self.assignments
                .enqueue(asserting_literal, 0, Reason::Clause(reference));
        } else {
            let reference =
                self.clause_allocator
                    .create_clause(result.learned_literals, true, premise);
            self.clausal_propagator
                .attach_clause(reference, &mut self.clause_allocator);
            if learned_length >= 3 {
                self.learned_clause_manager.register(reference);
            }
            self.assignments.enqueue(
                asserting_literal,
                result.backjump_level,
                Reason::Clause(reference),
            );
        }
    }

    fn compute_assumption_core(&mut self, failed_assumption: Literal) -> Vec<Literal> {
        let mut context = ConflictAnalysisContext {
            assignments: &mut self.assignments,
            clause_allocator: &mut self.clause_allocator,
            learned_clause_manager: &mut self.learned_clause_manager,
            variable_selector: &mut self.variable_selector,
            counters: &mut self.counters,
            theory: &mut self.theory,
            unit_proof_cache: &mut self.unit_proof_cache,
            store_proof: self.options.store_proof,
            learning_clause_minimisation: self.options.learning_clause_minimisation,
        };
        self.conflict_analyser
            .compute_assumption_core(failed_assumption, &mut context)
    }
}

// Introspection and certificates.
impl<Th: Theory> CdclSolver<Th> {
    /// The truth value of a literal under the current assignment.
    pub fn value(&self, literal: Literal) -> Result<bool, UndecidedLiteral> {
        if self.assignments.is_literal_assigned_true(literal) {
            Ok(true)
        } else if self.assignments.is_literal_assigned_false(literal) {
            Ok(false)
        } else {
            Err(UndecidedLiteral)
        }
    }

    /// The decision level at which a literal was assigned.
    pub fn value_level(&self, literal: Literal) -> Result<usize, UndecidedLiteral> {
        if self.assignments.is_literal_assigned(literal) {
            Ok(self.assignments.get_literal_assignment_level(literal))
        } else {
            Err(UndecidedLiteral)
        }
    }

    /// Whether the literal is forced true by the root-level facts.
    pub fn is_true_at_root(&self, literal: Literal) -> bool {
        self.assignments.is_literal_assigned_true(literal)
            && self.assignments.get_literal_assignment_level(literal) == 0
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn log_statistics(&self) {
        self.counters.log_statistics();
    }

    pub fn decision_level(&self) -> usize {
        self.assignments.get_decision_level()
    }

    /// The number of permanent hypothesis clauses added so far.
    pub fn num_clauses(&self) -> usize {
        self.num_hypothesis_clauses
    }

    pub fn num_learned_clauses(&self) -> usize {
        self.learned_clause_manager.num_learned_clauses()
    }

    pub fn num_restarts(&self) -> u64 {
        self.restart_strategy.num_restarts()
    }

    pub fn theory(&self) -> &Th {
        &self.theory
    }

    pub(crate) fn trail_iterator(&self) -> impl Iterator<Item = Literal> + '_ {
        (0..self.assignments.num_trail_entries())
            .map(|index| self.assignments.get_trail_entry(index))
    }

    pub(crate) fn stored_conflict(&self) -> Option<ClauseReference> {
        match &self.state {
            SolverState::Infeasible { conflict } => Some(*conflict),
            _ => None,
        }
    }

    pub(crate) fn stored_core(&self) -> &[Literal] {
        match &self.state {
            SolverState::InfeasibleUnderAssumptions { core } => core,
            _ => &[],
        }
    }

    /// Materialises the empty clause of a root-level refutation by resolving
    /// the stored conflict against the unit proofs of its literals.
    pub(crate) fn build_refutation(&mut self) -> Result<ClauseReference, ProofError> {
        if !self.options.store_proof {
            return Err(ProofError::NoProof);
        }
        let conflict = match &self.state {
            SolverState::Infeasible { conflict } => *conflict,
            _ => return Err(ProofError::NoProof),
        };
        if let Some(reference) = self.refutation {
            return Ok(reference);
        }

        let literals = self.clause_allocator[conflict]
            .get_literal_slice()
            .to_vec();
        let root = if literals.is_empty() {
            conflict
        } else {
            let mut context = ConflictAnalysisContext {
                assignments: &mut self.assignments,
                clause_allocator: &mut self.clause_allocator,
                learned_clause_manager: &mut self.learned_clause_manager,
                variable_selector: &mut self.variable_selector,
                counters: &mut self.counters,
                theory: &mut self.theory,
                unit_proof_cache: &mut self.unit_proof_cache,
                store_proof: self.options.store_proof,
                learning_clause_minimisation: self.options.learning_clause_minimisation,
            };
            let mut history = Vec::with_capacity(literals.len() + 1);
            history.push(conflict);
            let mut processed: Vec<Literal> = vec![];
            for literal in literals {
                if processed.contains(&literal) {
                    continue;
                }
                processed.push(literal);
                history.push(atom_unit_proof(&mut context, !literal));
            }
            self.clause_allocator
                .create_clause(vec![], false, Premise::History(history))
        };
        self.refutation = Some(root);
        Ok(root)
    }
}
