use super::clause::Clause;
use super::clause::Premise;
use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;

/// Owns every clause of the solver.
///
/// Allocation is append-only and clause references are never recycled: a dead
/// clause keeps its slot so the premise DAG stays intact across clause
/// database reductions.
#[derive(Debug)]
pub(crate) struct ClauseAllocator<L> {
    allocated_clauses: Vec<Clause<L>>,
}

impl<L> Default for ClauseAllocator<L> {
    fn default() -> Self {
        ClauseAllocator {
            allocated_clauses: vec![],
        }
    }
}

impl<L> ClauseAllocator<L> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        ClauseAllocator {
            allocated_clauses: Vec::with_capacity(capacity),
        }
    }
}

impl<L> ClauseAllocator<L> {
    pub(crate) fn create_clause(
        &mut self,
        literals: Vec<Literal>,
        is_removable: bool,
        premise: Premise<L>,
    ) -> ClauseReference {
        let clause_reference = ClauseReference::new(self.allocated_clauses.len() as u32);
        self.allocated_clauses
            .push(Clause::new(literals, is_removable, premise));
        clause_reference
    }

    pub(crate) fn get_clause(&self, clause_reference: ClauseReference) -> &Clause<L> {
        &self.allocated_clauses[clause_reference.id() as usize]
    }

    pub(crate) fn get_mutable_clause(&mut self, clause_reference: ClauseReference) -> &mut Clause<L> {
        &mut self.allocated_clauses[clause_reference.id() as usize]
    }

    pub(crate) fn num_clauses(&self) -> usize {
        self.allocated_clauses.len()
    }
}

impl<L> std::ops::Index<ClauseReference> for ClauseAllocator<L> {
    type Output = Clause<L>;

    fn index(&self, clause_reference: ClauseReference) -> &Clause<L> {
        self.get_clause(clause_reference)
    }
}

impl<L> std::ops::IndexMut<ClauseReference> for ClauseAllocator<L> {
    fn index_mut(&mut self, clause_reference: ClauseReference) -> &mut Clause<L> {
        self.get_mutable_clause(clause_reference)
    }
}
