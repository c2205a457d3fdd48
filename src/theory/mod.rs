//! The contract between the engine and a background theory.
//!
//! The engine treats atomic formulas as opaque values supplied by the host;
//! they are canonicalised and interned into [`Literal`]s. During the search
//! the theory is handed the newly assigned trail slice at every propagation
//! fixpoint ([`Theory::partial_check`]) and once more when the Boolean
//! assignment is total ([`Theory::final_check`]). The theory reacts through
//! [`TheoryActions`]: it can learn clauses, propagate literals with eager or
//! deferred explanations, suggest decisions, or raise a conflict. Actions are
//! buffered and applied by the engine in emission order once the check
//! returns; the theory never mutates the trail directly.

use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::basic_types::Literal;
use crate::engine::AtomStore;
use crate::engine::Assignments;
use crate::marrow_assert_simple;

/// The result of canonicalising a formula: whether the canonical form has the
/// same sign as the input or is its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    SameSign,
    Negated,
}

/// An atomic formula as seen by the engine.
///
/// The engine only ever canonicalises, negates, hashes and compares formulas;
/// their meaning lives entirely in the host and its theory.
pub trait TheoryFormula: Clone + Eq + Hash + Debug + Display {
    /// Returns the canonical form of this formula and whether the canonical
    /// form kept or flipped the sign. Repeated normalisation of the canonical
    /// form must be the identity.
    fn normalise(&self) -> (Self, Polarity);

    fn negated(&self) -> Self;
}

/// DIMACS-style formulas for pure SAT: any non-zero integer, where negative
/// values denote negation.
impl TheoryFormula for i32 {
    fn normalise(&self) -> (Self, Polarity) {
        marrow_assert_simple!(*self != 0);
        if *self < 0 {
            (-self, Polarity::Negated)
        } else {
            (*self, Polarity::SameSign)
        }
    }

    fn negated(&self) -> Self {
        -self
    }
}

/// The value of a formula under the current partial assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralValue {
    True,
    False,
    Undefined,
}

/// The justification a theory attaches to a propagation.
#[derive(Debug, Clone)]
pub enum Explanation<L> {
    /// The antecedents (literals currently true) which imply the propagated
    /// literal, available up front.
    Eager { antecedents: Vec<Literal>, lemma: L },
    /// A deferred explanation identified by an opaque payload. The engine asks
    /// for the antecedents through [`Theory::explain_propagation`] only if
    /// conflict analysis ever reaches the propagated variable.
    Lazy(u64),
}

/// The buffered effects of a theory check, drained by the engine after the
/// check returns. Decision hints persist until they are consumed or become
/// assigned.
#[derive(Debug)]
pub(crate) struct TheoryQueue<L> {
    pub(crate) clauses_to_add: Vec<(Vec<Literal>, L, bool)>,
    pub(crate) propagations: Vec<(Literal, Explanation<L>)>,
    pub(crate) next_decisions: Vec<Literal>,
    pub(crate) conflict: Option<(Vec<Literal>, L)>,
}

impl<L> Default for TheoryQueue<L> {
    fn default() -> Self {
        TheoryQueue {
            clauses_to_add: vec![],
            propagations: vec![],
            next_decisions: vec![],
            conflict: None,
        }
    }
}

/// The interface handed to the theory during a check.
pub struct TheoryActions<'a, F, L> {
    pub(crate) atoms: &'a mut AtomStore<F>,
    pub(crate) assignments: &'a Assignments,
    pub(crate) slice_start: usize,
    pub(crate) slice_end: usize,
    pub(crate) queue: &'a mut TheoryQueue<L>,
}

impl<F: TheoryFormula, L> TheoryActions<'_, F, L> {
    /// Iterates the trail slice this check is responsible for: every literal
    /// assigned since the previous theory call, in assignment order, paired
    /// with the formula it stands for.
    pub fn iter_assignments(&self) -> impl Iterator<Item = (Literal, F)> + '_ {
        self.assignments
            .trail_slice(self.slice_start, self.slice_end)
            .iter()
            .map(|&literal| (literal, self.atoms.formula(literal)))
    }

    /// Evaluates a formula under the current assignment without interning it.
    pub fn value_of(&self, formula: &F) -> LiteralValue {
        match self.atoms.lookup(formula) {
            // Atoms interned during this very check have no assignment row yet.
            Some(literal) if literal.variable().index() < self.assignments.num_variables() => {
                if self.assignments.is_literal_assigned_true(literal) {
                    LiteralValue::True
                } else if self.assignments.is_literal_assigned_false(literal) {
                    LiteralValue::False
                } else {
                    LiteralValue::Undefined
                }
            }
            _ => LiteralValue::Undefined,
        }
    }

    /// Interns a formula, creating a fresh unassigned atom if needed.
    pub fn intern(&mut self, formula: &F) -> Literal {
        self.atoms.intern(formula)
    }

    /// Suggests branching on `literal` before the activity heuristic is
    /// consulted. Hints which are already assigned when the engine branches
    /// are skipped.
    pub fn add_decision(&mut self, literal: Literal) {
        self.queue.next_decisions.push(literal);
    }

    /// Learns a clause. With `keep` the clause is permanent; otherwise it may
    /// later be removed by clause database reduction.
    pub fn add_clause(&mut self, literals: Vec<Literal>, lemma: L, keep: bool) {
        self.queue.clauses_to_add.push((literals, lemma, keep));
    }

    /// Propagates `literal` to true. If the literal is already true this is a
    /// no-op; if it is false the engine materialises the explanation into a
    /// clause and treats it as a theory conflict; otherwise the literal is
    /// enqueued at the current decision level.
    pub fn propagate(&mut self, literal: Literal, explanation: Explanation<L>) {
        self.queue.propagations.push((literal, explanation));
    }

    /// Signals that the given literals (all currently true) are jointly
    /// inconsistent in the theory. The engine turns their negations into a
    /// fresh removable clause with a `Lemma` premise and resolves the conflict
    /// through the usual analysis. Only the first conflict of a check is kept.
    pub fn raise_conflict(&mut self, literals: Vec<Literal>, lemma: L) {
        if self.queue.conflict.is_none() {
            self.queue.conflict = Some((literals, lemma));
        }
    }
}

/// A background theory for the CDCL(T) loop.
///
/// Levels follow a stack discipline: `push_level` is called whenever the
/// engine opens a decision level and `pop_levels(n)` whenever it backtracks,
/// so the theory state is restorable to any earlier level. Between decisions
/// the theory sees every newly assigned literal exactly once.
pub trait Theory {
    type Formula: TheoryFormula;
    type Lemma: Clone + Debug;

    /// Whether the engine should perform CDCL(T) bookkeeping at all. Pure SAT
    /// instances use [`EmptyTheory`], which opts out.
    fn has_theory(&self) -> bool {
        true
    }

    fn push_level(&mut self) {}

    fn pop_levels(&mut self, num_levels: usize) {
        let _ = num_levels;
    }

    /// Called at every Boolean propagation fixpoint with the newly assigned
    /// trail slice.
    fn partial_check(&mut self, actions: &mut TheoryActions<'_, Self::Formula, Self::Lemma>) {
        let _ = actions;
    }

    /// Called when the Boolean assignment is total and no theory work is
    /// pending. If the check completes without buffering any action, the
    /// engine reports satisfiability.
    fn final_check(&mut self, actions: &mut TheoryActions<'_, Self::Formula, Self::Lemma>) {
        let _ = actions;
    }

    /// Expands the payload of an [`Explanation::Lazy`] propagation into the
    /// antecedent literals (currently true) which imply the propagated
    /// literal, plus the lemma to attach to the materialised clause.
    fn explain_propagation(&mut self, code: u64) -> (Vec<Literal>, Self::Lemma) {
        unreachable!("the theory registered lazy propagation {code} but cannot explain it")
    }
}

/// The trivial theory: pure SAT.
#[derive(Debug, Clone, Copy)]
pub struct EmptyTheory<F> {
    formula: PhantomData<F>,
}

impl<F> Default for EmptyTheory<F> {
    fn default() -> Self {
        EmptyTheory {
            formula: PhantomData,
        }
    }
}

impl<F: TheoryFormula> Theory for EmptyTheory<F> {
    type Formula = F;
    type Lemma = ();

    fn has_theory(&self) -> bool {
        false
    }
}
