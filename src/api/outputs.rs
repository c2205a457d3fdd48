use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::engine::solver::CdclSolver;
use crate::proof::ProofError;
use crate::proof::ResolutionProof;
use crate::theory::Theory;

/// The outcome of a call to [`CdclSolver::solve`] or
/// [`CdclSolver::solve_under_assumptions`].
#[derive(Debug)]
pub enum SatisfactionResult<'solver, Th: Theory> {
    Satisfiable(Satisfiable<'solver, Th>),
    Unsatisfiable(Unsatisfiable<'solver, Th>),
    /// The search was interrupted by the termination condition before a
    /// conclusion was reached.
    Unknown,
}

/// A handle on a satisfying total assignment.
#[derive(Debug)]
pub struct Satisfiable<'solver, Th: Theory> {
    solver: &'solver CdclSolver<Th>,
}

impl<'solver, Th: Theory> Satisfiable<'solver, Th> {
    pub(crate) fn new(solver: &'solver CdclSolver<Th>) -> Self {
        Satisfiable { solver }
    }

    /// The satisfying assignment in trail order.
    pub fn iter_trail(&self) -> impl Iterator<Item = Literal> + '_ {
        self.solver.trail_iterator()
    }

    pub fn value(&self, literal: Literal) -> bool {
        self.solver
            .value(literal)
            .expect("the assignment is total in a satisfiable result")
    }

    /// The decision level at which the literal got its value.
    pub fn value_level(&self, literal: Literal) -> usize {
        self.solver
            .value_level(literal)
            .expect("the assignment is total in a satisfiable result")
    }
}

/// A handle on an unsatisfiability result: either a root-level refutation or a
/// conflict among the supplied assumptions.
#[derive(Debug)]
pub struct Unsatisfiable<'solver, Th: Theory> {
    solver: &'solver mut CdclSolver<Th>,
}

impl<'solver, Th: Theory> Unsatisfiable<'solver, Th> {
    pub(crate) fn new(solver: &'solver mut CdclSolver<Th>) -> Self {
        Unsatisfiable { solver }
    }

    /// The clause which is falsified by the root-level assignment, or `None`
    /// when the inconsistency involves the assumptions.
    pub fn conflict_clause(&self) -> Option<&[Literal]> {
        self.solver
            .stored_conflict()
            .map(|reference: ClauseReference| {
                self.solver.clause_allocator[reference].get_literal_slice()
            })
    }

    /// The subset of the assumptions responsible for unsatisfiability. Empty
    /// when the problem is unsatisfiable regardless of assumptions.
    pub fn core(&self) -> &[Literal] {
        self.solver.stored_core()
    }

    /// Reconstructs the resolution proof of the empty clause. Fails with
    /// [`ProofError::NoProof`] when proof storage is disabled or when the
    /// inconsistency is relative to assumptions.
    pub fn proof(&mut self) -> Result<ResolutionProof<'_, Th::Lemma>, ProofError> {
        let root = self.solver.build_refutation()?;
        Ok(ResolutionProof::new(&mut self.solver.clause_allocator, root))
    }
}
