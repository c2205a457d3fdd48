//! Reconstruction of resolution proofs from clause premises.
//!
//! Every clause carries a [`Premise`](crate::engine::clause::Premise): leaves
//! are hypotheses, assumption clauses and theory lemmas, while derived clauses
//! record the parents they were resolved from. The premise graph is a DAG
//! (subproofs may be shared) and this module walks it: classifying single
//! nodes, collecting unsatisfiable cores, and folding a visitor over the whole
//! proof bottom-up.

use crate::basic_types::ClauseReference;
use crate::basic_types::HashSet;
use crate::basic_types::Literal;
use crate::engine::clause::Premise;
use crate::engine::clause_allocator::ClauseAllocator;
use crate::marrow_assert_advanced;

#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// A proof was requested but proof storage was disabled, or the solve did
    /// not end with a root-level refutation.
    #[error("no proof is available for this result")]
    NoProof,
    /// The premise graph is malformed; this indicates a solver-internal
    /// invariant violation.
    #[error("malformed resolution history: {0}")]
    ResolutionError(String),
}

/// The coarse classification passed to [`ResolutionProof::fold`] visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofNodeKind {
    Hypothesis,
    Assumption,
    Lemma,
    Resolution,
}

/// The result of expanding a single proof node.
#[derive(Debug, Clone)]
pub enum ProofExpansion {
    /// A top-level input clause.
    Hypothesis,
    /// A clause stemming from a solve-time assumption.
    Assumption,
    /// A clause produced by the background theory.
    Lemma,
    /// The clause is its single parent with duplicate literals removed.
    Duplicate {
        parent: ClauseReference,
        duplicated: Vec<Literal>,
    },
    /// A hyper-resolution step: the initial clause is resolved against each
    /// listed clause in order, on the recorded pivot.
    HyperResolution {
        initial: ClauseReference,
        steps: Vec<(Literal, ClauseReference)>,
    },
}

/// A handle on the resolution proof of an unsatisfiability result, rooted at
/// the empty clause.
///
/// Traversals use the transient `visited` flag on clauses and clear it again
/// before returning, so the flag stays usable across proof queries.
#[derive(Debug)]
pub struct ResolutionProof<'a, L> {
    clause_allocator: &'a mut ClauseAllocator<L>,
    root: ClauseReference,
}

impl<'a, L> ResolutionProof<'a, L> {
    pub(crate) fn new(
        clause_allocator: &'a mut ClauseAllocator<L>,
        root: ClauseReference,
    ) -> Self {
        ResolutionProof {
            clause_allocator,
            root,
        }
    }

    /// The empty clause this proof derives.
    pub fn root(&self) -> ClauseReference {
        self.root
    }

    pub fn literals(&self, node: ClauseReference) -> &[Literal] {
        self.clause_allocator[node].get_literal_slice()
    }

    /// Checks that `node` carries a usable justification.
    pub fn prove(&self, node: ClauseReference) -> Result<ClauseReference, ProofError> {
        match self.clause_allocator[node].premise() {
            Premise::Untracked => Err(ProofError::NoProof),
            Premise::History(parents) if parents.is_empty() => Err(ProofError::ResolutionError(
                format!("clause {node} has an empty history"),
            )),
            _ => Ok(node),
        }
    }

    /// Classifies the premise of a node, reconstructing the pivots of a
    /// resolution step. A history step without a unique pivot raises a
    /// [`ProofError::ResolutionError`].
    pub fn expand(&self, node: ClauseReference) -> Result<ProofExpansion, ProofError> {
        match self.clause_allocator[node].premise() {
            Premise::Hypothesis(_) => Ok(ProofExpansion::Hypothesis),
            Premise::Assumption => Ok(ProofExpansion::Assumption),
            Premise::Lemma(_) => Ok(ProofExpansion::Lemma),
            Premise::Untracked => Err(ProofError::NoProof),
            Premise::History(parents) => match parents.as_slice() {
                [] => Err(ProofError::ResolutionError(format!(
                    "clause {node} has an empty history"
                ))),
                [parent] => Ok(ProofExpansion::Duplicate {
                    parent: *parent,
                    duplicated: self.duplicated_literals(*parent),
                }),
                _ => Ok(ProofExpansion::HyperResolution {
                    initial: parents[0],
                    steps: self.find_pivots(node, parents)?,
                }),
            },
        }
    }

    /// The lemma attached to a hypothesis or theory clause, if any.
    pub fn lemma(&self, node: ClauseReference) -> Option<&L> {
        match self.clause_allocator[node].premise() {
            Premise::Hypothesis(lemma) | Premise::Lemma(lemma) => Some(lemma),
            _ => None,
        }
    }

    fn duplicated_literals(&self, parent: ClauseReference) -> Vec<Literal> {
        let mut seen: HashSet<Literal> = HashSet::default();
        let mut duplicated = vec![];
        for &literal in self.clause_allocator[parent].get_literal_slice() {
            if !seen.insert(literal) && !duplicated.contains(&literal) {
                duplicated.push(literal);
            }
        }
        duplicated
    }

    /// Replays a resolution chain: for each parent beyond the first, the
    /// unique literal whose negation is in the running resolvent is the pivot.
    fn find_pivots(
        &self,
        node: ClauseReference,
        parents: &[ClauseReference],
    ) -> Result<Vec<(Literal, ClauseReference)>, ProofError> {
        let mut resolvent: HashSet<Literal> = self.clause_allocator[parents[0]]
            .get_literal_slice()
            .iter()
            .copied()
            .collect();

        let mut steps = Vec::with_capacity(parents.len() - 1);
        for &parent in &parents[1..] {
            let mut pivot: Option<Literal> = None;
            for &literal in self.clause_allocator[parent].get_literal_slice() {
                if resolvent.contains(&!literal) {
                    if pivot.is_some() && pivot != Some(literal) {
                        return Err(ProofError::ResolutionError(format!(
                            "multiple pivots between clause {node} and parent {parent}"
                        )));
                    }
                    pivot = Some(literal);
                }
            }
            let pivot = pivot.ok_or_else(|| {
                ProofError::ResolutionError(format!(
                    "no pivot between clause {node} and parent {parent}"
                ))
            })?;

            let _ = resolvent.remove(&!pivot);
            for &literal in self.clause_allocator[parent].get_literal_slice() {
                if literal != pivot {
                    let _ = resolvent.insert(literal);
                }
            }
            steps.push((pivot, parent));
        }

        marrow_assert_advanced!({
            let derived: HashSet<Literal> = self.clause_allocator[node]
                .get_literal_slice()
                .iter()
                .copied()
                .collect();
            resolvent == derived
        });

        Ok(steps)
    }

    /// Collects the leaves (hypotheses, assumption clauses, theory lemmas)
    /// this proof rests on, each exactly once.
    pub fn unsat_core(&mut self) -> Vec<ClauseReference> {
        let mut core = vec![];
        let mut visited = vec![];
        let mut stack = vec![self.root];

        while let Some(node) = stack.pop() {
            if self.clause_allocator[node].is_visited() {
                continue;
            }
            self.clause_allocator[node].set_visited(true);
            visited.push(node);

            match self.clause_allocator[node].premise() {
                Premise::History(parents) => stack.extend(parents.iter().copied()),
                Premise::Hypothesis(_) | Premise::Assumption | Premise::Lemma(_) => {
                    core.push(node)
                }
                Premise::Untracked => {}
            }
        }

        for node in visited {
            self.clause_allocator[node].set_visited(false);
        }
        core
    }

    /// Folds a visitor over the proof DAG in post-order: every node is visited
    /// exactly once, after all of its parents.
    pub fn fold<A>(
        &mut self,
        initial: A,
        mut visit: impl FnMut(A, ClauseReference, ProofNodeKind) -> A,
    ) -> A {
        enum Task {
            Enter(ClauseReference),
            Leave(ClauseReference),
        }

        let mut accumulator = initial;
        let mut visited = vec![];
        let mut stack = vec![Task::Enter(self.root)];

        while let Some(task) = stack.pop() {
            match task {
                Task::Enter(node) => {
                    if self.clause_allocator[node].is_visited() {
                        continue;
                    }
                    self.clause_allocator[node].set_visited(true);
                    visited.push(node);
                    stack.push(Task::Leave(node));
                    if let Premise::History(parents) = self.clause_allocator[node].premise() {
                        for &parent in parents.iter() {
                            stack.push(Task::Enter(parent));
                        }
                    }
                }
                Task::Leave(node) => {
                    let kind = match self.clause_allocator[node].premise() {
                        Premise::Hypothesis(_) => ProofNodeKind::Hypothesis,
                        Premise::Assumption => ProofNodeKind::Assumption,
                        Premise::Lemma(_) => ProofNodeKind::Lemma,
                        Premise::History(_) | Premise::Untracked => ProofNodeKind::Resolution,
                    };
                    accumulator = visit(accumulator, node, kind);
                }
            }
        }

        for node in visited {
            self.clause_allocator[node].set_visited(false);
        }
        accumulator
    }
}
