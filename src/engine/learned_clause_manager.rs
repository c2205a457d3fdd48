use log::debug;

use super::assignments::Assignments;
use super::clause_allocator::ClauseAllocator;
use super::reason::Reason;
use crate::basic_types::ClauseReference;
use crate::marrow_assert_moderate;

/// Options controlling clause learning and the clause database.
#[derive(Debug, Clone, Copy)]
pub struct LearningOptions {
    /// The initial learned clause limit as a fraction of the number of
    /// problem clauses.
    pub initial_limit_ratio: f64,
    /// Multiplier applied to the learned clause limit on every restart.
    pub limit_growth_factor: f64,
    /// Threshold above which clause activities are rescaled.
    pub max_clause_activity: f32,
    /// Decay factor for clause activities.
    pub clause_activity_decay_factor: f32,
}

impl Default for LearningOptions {
    fn default() -> Self {
        Self {
            initial_limit_ratio: 1.0 / 3.0,
            limit_growth_factor: 1.1,
            max_clause_activity: 1e20,
            clause_activity_decay_factor: 0.999,
        }
    }
}

/// Tracks the learned clauses eligible for deletion and their activities.
///
/// Learned clauses of length two or less are never registered here (they are
/// kept forever), so every tracked clause participates in database reduction.
#[derive(Debug)]
pub(crate) struct LearnedClauseManager {
    learned_clauses: Vec<ClauseReference>,
    parameters: LearningOptions,
    clause_bump_increment: f32,
}

impl LearnedClauseManager {
    pub(crate) fn new(parameters: LearningOptions) -> Self {
        LearnedClauseManager {
            learned_clauses: vec![],
            parameters,
            clause_bump_increment: 1.0,
        }
    }

    pub(crate) fn register(&mut self, clause_reference: ClauseReference) {
        self.learned_clauses.push(clause_reference);
    }

    pub(crate) fn num_learned_clauses(&self) -> usize {
        self.learned_clauses.len()
    }

    /// Marks the least active learned clauses dead until at most `limit`
    /// tracked clauses remain. Clauses currently recorded as the reason of a
    /// trail assignment are locked and skipped; dead clauses are reclaimed
    /// from the watch lists lazily during propagation.
    pub(crate) fn reduce_database<L>(
        &mut self,
        limit: usize,
        clause_allocator: &mut ClauseAllocator<L>,
        assignments: &Assignments,
    ) {
        if self.learned_clauses.len() <= limit {
            return;
        }

        // Better clauses towards the front.
        self.learned_clauses.sort_unstable_by(|a, b| {
            let activity_a = clause_allocator[*a].get_activity();
            let activity_b = clause_allocator[*b].get_activity();
            activity_b.partial_cmp(&activity_a).unwrap()
        });

        let mut num_clauses_to_remove = self.learned_clauses.len() - limit;
        for &clause_reference in self.learned_clauses.iter().rev() {
            if num_clauses_to_remove == 0 {
                break;
            }
            if is_locked(clause_reference, clause_allocator, assignments) {
                continue;
            }
            clause_allocator[clause_reference].mark_dead();
            num_clauses_to_remove -= 1;
        }

        let before = self.learned_clauses.len();
        self.learned_clauses
            .retain(|&clause_reference| !clause_allocator[clause_reference].is_dead());
        debug!(
            "Clause database reduction removed {} of {} learned clauses",
            before - self.learned_clauses.len(),
            before
        );
    }

    pub(crate) fn bump_clause_activity<L>(
        &mut self,
        clause_reference: ClauseReference,
        clause_allocator: &mut ClauseAllocator<L>,
    ) {
        marrow_assert_moderate!(clause_allocator[clause_reference].is_removable());
        if clause_allocator[clause_reference].get_activity() + self.clause_bump_increment
            > self.parameters.max_clause_activity
        {
            self.rescale_clause_activities(clause_allocator);
        }
        clause_allocator[clause_reference].increase_activity(self.clause_bump_increment);
    }

    fn rescale_clause_activities<L>(&mut self, clause_allocator: &mut ClauseAllocator<L>) {
        for &clause_reference in self.learned_clauses.iter() {
            clause_allocator[clause_reference].divide_activity(self.parameters.max_clause_activity);
        }
        self.clause_bump_increment /= self.parameters.max_clause_activity;
    }

    pub(crate) fn decay_clause_activities(&mut self) {
        self.clause_bump_increment /= self.parameters.clause_activity_decay_factor;
    }
}

/// A clause is locked while it is the recorded reason of the assignment of its
/// first literal; deleting it would leave a dangling reason on the trail.
fn is_locked<L>(
    clause_reference: ClauseReference,
    clause_allocator: &ClauseAllocator<L>,
    assignments: &Assignments,
) -> bool {
    let propagated = clause_allocator[clause_reference][0];
    assignments.is_literal_assigned_true(propagated)
        && assignments.get_variable_reason(propagated.variable())
            == Reason::Clause(clause_reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Literal;
    use crate::basic_types::Variable;
    use crate::engine::clause::Premise;

    fn positive(index: u32) -> Literal {
        Literal::new(Variable::new(index), true)
    }

    fn removable_clause(
        clause_allocator: &mut ClauseAllocator<()>,
        literals: Vec<Literal>,
    ) -> ClauseReference {
        clause_allocator.create_clause(literals, true, Premise::Untracked)
    }

    #[test]
    fn reduction_marks_the_least_active_clauses_dead() {
        let mut clause_allocator: ClauseAllocator<()> = ClauseAllocator::default();
        let mut assignments = Assignments::default();
        for _ in 0..4 {
            assignments.grow();
        }

        let mut manager = LearnedClauseManager::new(LearningOptions::default());
        let active = removable_clause(&mut clause_allocator, vec![positive(0), positive(1)]);
        let stale = removable_clause(&mut clause_allocator, vec![positive(2), positive(3)]);
        manager.register(active);
        manager.register(stale);
        manager.bump_clause_activity(active, &mut clause_allocator);

        manager.reduce_database(1, &mut clause_allocator, &assignments);

        assert!(!clause_allocator[active].is_dead());
        assert!(clause_allocator[stale].is_dead());
        assert_eq!(manager.num_learned_clauses(), 1);
    }

    #[test]
    fn clauses_locked_as_reasons_survive_reduction() {
        let mut clause_allocator: ClauseAllocator<()> = ClauseAllocator::default();
        let mut assignments = Assignments::default();
        for _ in 0..4 {
            assignments.grow();
        }

        let mut manager = LearnedClauseManager::new(LearningOptions::default());
        let locked = removable_clause(&mut clause_allocator, vec![positive(0), positive(1)]);
        let free = removable_clause(&mut clause_allocator, vec![positive(2), positive(3)]);
        manager.register(locked);
        manager.register(free);
        manager.bump_clause_activity(free, &mut clause_allocator);

        // The clause propagated its first literal, so it is locked.
        assignments.enqueue(positive(0), 0, Reason::Clause(locked));

        manager.reduce_database(1, &mut clause_allocator, &assignments);

        assert!(!clause_allocator[locked].is_dead());
        assert!(clause_allocator[free].is_dead());
    }
}
