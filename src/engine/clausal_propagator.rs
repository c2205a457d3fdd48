//! Unit propagation over clauses with the two-watched-literal scheme: once all
//! but one literal in a clause are falsified, the remaining literal is
//! propagated to true.
//!
//! A clause is registered in the watch lists of the *negations* of its two
//! watch literals (slots 0 and 1), so enqueuing a literal `p` visits exactly
//! the clauses in which `!p` is a watch. Clauses marked dead are swept out of
//! the watch lists lazily as they are encountered here.

use super::assignments::Assignments;
use super::clause_allocator::ClauseAllocator;
use super::reason::Reason;
use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;

#[derive(Default, Debug)]
pub(crate) struct ClausalPropagator {
    /// One watch list per literal, indexed by the literal code.
    watch_lists: Vec<Vec<ClauseReference>>,
    /// The next trail position to be propagated; propagation has reached a
    /// fixpoint when this equals the trail length.
    next_position_on_trail_to_propagate: usize,
}

impl ClausalPropagator {
    pub(crate) fn grow(&mut self) {
        // One watch list per polarity.
        self.watch_lists.push(vec![]);
        self.watch_lists.push(vec![]);
    }

    pub(crate) fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_position_on_trail_to_propagate == trail_size
    }

    pub(crate) fn synchronise(&mut self, trail_size: usize) {
        marrow_assert_simple!(self.next_position_on_trail_to_propagate >= trail_size);
        self.next_position_on_trail_to_propagate = trail_size;
    }

    /// Starts watching an unwatched clause of length at least two. Slots 0 and
    /// 1 of the clause become the watches.
    pub(crate) fn attach_clause<L>(
        &mut self,
        clause_reference: ClauseReference,
        clause_allocator: &mut ClauseAllocator<L>,
    ) {
        let clause = clause_allocator.get_mutable_clause(clause_reference);
        marrow_assert_simple!(clause.len() >= 2);
        clause.mark_attached();
        let first_watch = clause[0];
        let second_watch = clause[1];

        self.watch_lists[!first_watch].push(clause_reference);
        self.watch_lists[!second_watch].push(clause_reference);
    }

    /// Propagates until fixpoint or conflict. On conflict the propagation head
    /// jumps to the end of the trail; the entries it skips are consumed by the
    /// backtrack that follows every conflict.
    pub(crate) fn propagate<L>(
        &mut self,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator<L>,
    ) -> Result<(), ClauseReference> {
        while self.next_position_on_trail_to_propagate < assignments.num_trail_entries() {
            let true_literal =
                assignments.get_trail_entry(self.next_position_on_trail_to_propagate);
            marrow_assert_moderate!(assignments.is_literal_assigned_true(true_literal));
            let false_literal = !true_literal;
            let decision_level = assignments.get_decision_level();

            // The watch list is compacted in place: watchers that stay are
            // copied towards the front, watchers that move to another list or
            // belong to dead clauses are skipped.
            let mut end_index: usize = 0;
            let mut current_index: usize = 0;
            while current_index < self.watch_lists[true_literal].len() {
                let clause_reference = self.watch_lists[true_literal][current_index];

                let clause = clause_allocator.get_mutable_clause(clause_reference);
                if clause.is_dead() {
                    current_index += 1;
                    continue;
                }

                // Place the falsified watch at slot 1.
                if clause[0] == false_literal {
                    clause.swap_literals(0, 1);
                }
                marrow_assert_moderate!(clause[1] == false_literal);

                let other_watch = clause[0];
                if assignments.is_literal_assigned_true(other_watch) {
                    // Clause is satisfied, keep the watcher.
                    self.watch_lists[true_literal][end_index] = clause_reference;
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                // Look for a non-falsified literal to replace the watch.
                let mut found_new_watch = false;
                for k in 2..clause.len() {
                    if !assignments.is_literal_assigned_false(clause[k]) {
                        clause.swap_literals(1, k as usize);
                        found_new_watch = true;
                        break;
                    }
                }

                if found_new_watch {
                    let new_watch = clause_allocator[clause_reference][1];
                    self.watch_lists[!new_watch].push(clause_reference);
                    // The watcher moved; skipping it removes it from this list.
                    current_index += 1;
                    continue;
                }

                // No replacement: every literal beyond slot 0 is false.
                self.watch_lists[true_literal][end_index] = clause_reference;
                current_index += 1;
                end_index += 1;

                if assignments.is_literal_unassigned(other_watch) {
                    assignments.enqueue(
                        other_watch,
                        decision_level,
                        Reason::Clause(clause_reference),
                    );
                } else {
                    // Conflict: slot 0 is false as well. Keep the remaining
                    // watchers and stop propagating; the pending trail entries
                    // are consumed by the imminent backtrack.
                    while current_index < self.watch_lists[true_literal].len() {
                        self.watch_lists[true_literal][end_index] =
                            self.watch_lists[true_literal][current_index];
                        current_index += 1;
                        end_index += 1;
                    }
                    self.watch_lists[true_literal].truncate(end_index);
                    self.next_position_on_trail_to_propagate = assignments.num_trail_entries();
                    return Err(clause_reference);
                }
            }
            self.watch_lists[true_literal].truncate(end_index);
            self.next_position_on_trail_to_propagate += 1;
        }
        Ok(())
    }

    /// Checks that every attached live clause of length at least two is
    /// watched by exactly its first two literals, each watcher appearing
    /// exactly once. Used by the extreme assertion tier.
    pub(crate) fn debug_check_watchers<L>(&self, clause_allocator: &ClauseAllocator<L>) -> bool {
        for id in 0..clause_allocator.num_clauses() {
            let clause_reference = ClauseReference::new(id as u32);
            let clause = clause_allocator.get_clause(clause_reference);
            if !clause.is_attached() || clause.is_dead() {
                continue;
            }

            let watch_count = |literal: Literal| {
                self.watch_lists[literal]
                    .iter()
                    .filter(|reference| **reference == clause_reference)
                    .count()
            };

            assert!(
                watch_count(!clause[0]) == 1 && watch_count(!clause[1]) == 1,
                "Clause {clause_reference} is not watched by its first two literals"
            );

            let total: usize = self
                .watch_lists
                .iter()
                .map(|watchers| {
                    watchers
                        .iter()
                        .filter(|reference| **reference == clause_reference)
                        .count()
                })
                .sum();
            assert!(
                total == 2,
                "Clause {clause_reference} appears {total} times in the watch lists"
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Variable;
    use crate::engine::clause::Premise;

    struct Setup {
        propagator: ClausalPropagator,
        assignments: Assignments,
        clause_allocator: ClauseAllocator<()>,
    }

    fn setup(num_variables: u32) -> Setup {
        let mut propagator = ClausalPropagator::default();
        let mut assignments = Assignments::default();
        for _ in 0..num_variables {
            propagator.grow();
            assignments.grow();
        }
        Setup {
            propagator,
            assignments,
            clause_allocator: ClauseAllocator::default(),
        }
    }

    fn positive(index: u32) -> Literal {
        Literal::new(Variable::new(index), true)
    }

    fn attach(setup: &mut Setup, literals: Vec<Literal>) -> ClauseReference {
        let reference =
            setup
                .clause_allocator
                .create_clause(literals, false, Premise::Untracked);
        setup
            .propagator
            .attach_clause(reference, &mut setup.clause_allocator);
        reference
    }

    #[test]
    fn a_clause_with_one_remaining_literal_propagates_it() {
        let mut setup = setup(2);
        let (a, b) = (positive(0), positive(1));
        let reference = attach(&mut setup, vec![a, b]);

        setup.assignments.enqueue_decision_literal(!a);
        let result = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        assert!(result.is_ok());
        assert!(setup.assignments.is_literal_assigned_true(b));
        assert_eq!(
            setup.assignments.get_variable_reason(b.variable()),
            Reason::Clause(reference)
        );
        assert!(setup.propagator.debug_check_watchers(&setup.clause_allocator));
    }

    #[test]
    fn a_fully_falsified_clause_is_reported_as_a_conflict() {
        let mut setup = setup(2);
        let (a, b) = (positive(0), positive(1));
        let _ = attach(&mut setup, vec![a, b]);
        let second = attach(&mut setup, vec![a, !b]);

        setup.assignments.enqueue_decision_literal(!a);
        let result = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        assert_eq!(result, Err(second));
        // The head consumed the remaining trail.
        assert!(setup
            .propagator
            .is_propagation_complete(setup.assignments.num_trail_entries()));
    }

    #[test]
    fn falsifying_a_watch_moves_it_to_an_unassigned_literal() {
        let mut setup = setup(4);
        let (a, b, c, d) = (positive(0), positive(1), positive(2), positive(3));
        let reference = attach(&mut setup, vec![a, b, c, d]);
        assert!(setup.propagator.watch_lists[!a].contains(&reference));

        // Setting a to false moves the watch off a to one of {b, c, d}.
        setup.assignments.enqueue_decision_literal(!a);
        let result = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        assert!(result.is_ok());
        assert!(!setup.propagator.watch_lists[!a].contains(&reference));
        let clause = setup.clause_allocator.get_clause(reference);
        assert!(clause[0] != a && clause[1] != a);
        assert!(setup.propagator.watch_lists[!clause[1]].contains(&reference));
        assert!(setup.propagator.debug_check_watchers(&setup.clause_allocator));
    }

    #[test]
    fn dead_clauses_are_swept_from_the_watch_lists() {
        let mut setup = setup(2);
        let (a, b) = (positive(0), positive(1));
        let reference = attach(&mut setup, vec![a, b]);
        setup
            .clause_allocator
            .get_mutable_clause(reference)
            .mark_dead();

        setup.assignments.enqueue_decision_literal(!a);
        let result = setup
            .propagator
            .propagate(&mut setup.assignments, &mut setup.clause_allocator);

        assert!(result.is_ok());
        assert!(setup.assignments.is_literal_unassigned(b));
        assert!(setup.propagator.watch_lists[!a].is_empty());
    }
}
