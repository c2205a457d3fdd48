use super::reason::Reason;
use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;

/// The totally-ordered assignment stack together with the per-variable
/// assignment information.
///
/// The trail holds literals in assignment order; `level_boundaries[i]` is the
/// trail length at the moment decision level `i + 1` was opened, so the number
/// of boundaries equals the current decision level. Entries below
/// `level_boundaries[0]` are root facts.
#[derive(Default, Debug)]
pub(crate) struct Assignments {
    assignment_info: Vec<AssignmentInfo>,
    trail: Vec<Literal>,
    level_boundaries: Vec<usize>,
}

#[derive(PartialEq, Clone, Copy, Default, Debug)]
enum AssignmentInfo {
    Assigned {
        truth_value: bool,
        decision_level: usize,
        reason: Reason,
    },
    #[default]
    Unassigned,
}

impl Assignments {
    pub(crate) fn grow(&mut self) {
        self.assignment_info.push(AssignmentInfo::Unassigned);
    }

    pub(crate) fn num_variables(&self) -> u32 {
        self.assignment_info.len() as u32
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.level_boundaries.len()
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.level_boundaries.push(self.trail.len());
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn get_trail_entry(&self, index: usize) -> Literal {
        self.trail[index]
    }

    pub(crate) fn trail_slice(&self, start: usize, end: usize) -> &[Literal] {
        &self.trail[start..end]
    }

    pub(crate) fn is_at_the_root_level(&self) -> bool {
        self.get_decision_level() == 0
    }

    pub(crate) fn is_variable_assigned(&self, variable: Variable) -> bool {
        self.assignment_info[variable] != AssignmentInfo::Unassigned
    }

    pub(crate) fn is_variable_unassigned(&self, variable: Variable) -> bool {
        self.assignment_info[variable] == AssignmentInfo::Unassigned
    }

    pub(crate) fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.is_variable_assigned(literal.variable())
    }

    pub(crate) fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.is_variable_unassigned(literal.variable())
    }

    pub(crate) fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        match self.assignment_info[literal.variable()] {
            AssignmentInfo::Assigned { truth_value, .. } => truth_value == literal.is_positive(),
            AssignmentInfo::Unassigned => false,
        }
    }

    pub(crate) fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && !self.is_literal_assigned_true(literal)
    }

    pub(crate) fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && self.get_literal_assignment_level(literal) == 0
    }

    pub(crate) fn get_variable_assignment_level(&self, variable: Variable) -> usize {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { decision_level, .. } => decision_level,
            AssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have assignment levels")
            }
        }
    }

    pub(crate) fn get_literal_assignment_level(&self, literal: Literal) -> usize {
        self.get_variable_assignment_level(literal.variable())
    }

    pub(crate) fn get_variable_reason(&self, variable: Variable) -> Reason {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { reason, .. } => reason,
            AssignmentInfo::Unassigned => panic!("Unassigned variables do not have reasons"),
        }
    }

    pub(crate) fn is_variable_decision(&self, variable: Variable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { reason, .. } => reason.is_decision(),
            AssignmentInfo::Unassigned => false,
        }
    }

    /// Overwrites the recorded reason of an assigned variable. Used to replace
    /// a lazy theory reason with its materialised explanation clause.
    pub(crate) fn replace_reason(&mut self, variable: Variable, new_reason: Reason) {
        match &mut self.assignment_info[variable] {
            AssignmentInfo::Assigned { reason, .. } => *reason = new_reason,
            AssignmentInfo::Unassigned => panic!("Cannot replace the reason of an unassigned variable"),
        }
    }

    /// Re-records an assigned variable as a root fact. Used when a unit
    /// clause arrives for a literal which is already true at a higher level:
    /// the assignment now holds at level zero, and backtracking retains it.
    pub(crate) fn promote_to_root(&mut self, variable: Variable, new_reason: Reason) {
        match &mut self.assignment_info[variable] {
            AssignmentInfo::Assigned {
                decision_level,
                reason,
                ..
            } => {
                *decision_level = 0;
                *reason = new_reason;
            }
            AssignmentInfo::Unassigned => panic!("Cannot promote an unassigned variable"),
        }
    }

    pub(crate) fn enqueue_decision_literal(&mut self, decision_literal: Literal) {
        let level = self.get_decision_level();
        self.enqueue(decision_literal, level, Reason::Decision);
    }

    /// Assigns `literal` to true at the given level with the given reason and
    /// pushes it onto the trail. Enqueuing a literal that already has a value
    /// is a programming error; callers check the value first.
    pub(crate) fn enqueue(&mut self, literal: Literal, decision_level: usize, reason: Reason) {
        marrow_assert_simple!(
            self.is_literal_unassigned(literal),
            "Enqueued literal {literal} already has a value"
        );
        marrow_assert_moderate!(decision_level <= self.get_decision_level());

        self.assignment_info[literal.variable()] = AssignmentInfo::Assigned {
            truth_value: literal.is_positive(),
            decision_level,
            reason,
        };
        self.trail.push(literal);
    }

    /// Backtracks to `target_level`. Popped entries whose recorded level is at
    /// or below the target (late propagations) survive and are packed towards
    /// the new trail head; all other entries are unassigned and returned so
    /// the caller can restore branching state.
    pub(crate) fn synchronise(&mut self, target_level: usize) -> Vec<Literal> {
        marrow_assert_simple!(target_level < self.get_decision_level());

        let new_start = self.level_boundaries[target_level];
        self.level_boundaries.truncate(target_level);

        let mut kept = new_start;
        let mut unassigned = Vec::new();
        for index in new_start..self.trail.len() {
            let literal = self.trail[index];
            let level = self.get_literal_assignment_level(literal);
            if level <= target_level {
                self.trail[kept] = literal;
                kept += 1;
            } else {
                self.assignment_info[literal.variable()] = AssignmentInfo::Unassigned;
                unassigned.push(literal);
            }
        }
        self.trail.truncate(kept);
        unassigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::ClauseReference;

    fn assignments_with_variables(num_variables: u32) -> Assignments {
        let mut assignments = Assignments::default();
        for _ in 0..num_variables {
            assignments.grow();
        }
        assignments
    }

    fn positive(index: u32) -> Literal {
        Literal::new(Variable::new(index), true)
    }

    #[test]
    fn enqueued_literals_are_true_and_their_negations_false() {
        let mut assignments = assignments_with_variables(2);
        assignments.enqueue(positive(0), 0, Reason::Decision);

        assert!(assignments.is_literal_assigned_true(positive(0)));
        assert!(assignments.is_literal_assigned_false(!positive(0)));
        assert!(assignments.is_literal_unassigned(positive(1)));
    }

    #[test]
    fn backtracking_unassigns_levels_beyond_the_target() {
        let mut assignments = assignments_with_variables(3);
        assignments.enqueue(positive(0), 0, Reason::Decision);
        assignments.increase_decision_level();
        assignments.enqueue(positive(1), 1, Reason::Decision);
        assignments.increase_decision_level();
        assignments.enqueue(positive(2), 2, Reason::Decision);

        let unassigned = assignments.synchronise(1);

        assert_eq!(unassigned, vec![positive(2)]);
        assert_eq!(assignments.num_trail_entries(), 2);
        assert_eq!(assignments.get_decision_level(), 1);
        assert!(assignments.is_literal_assigned_true(positive(1)));
        assert!(assignments.is_literal_unassigned(positive(2)));
    }

    #[test]
    fn late_propagations_survive_backtracking() {
        let mut assignments = assignments_with_variables(4);
        assignments.enqueue(positive(0), 0, Reason::Decision);
        assignments.increase_decision_level();
        assignments.enqueue(positive(1), 1, Reason::Decision);
        assignments.increase_decision_level();
        assignments.enqueue(positive(2), 2, Reason::Decision);
        // A propagation recorded below the current decision level.
        assignments.enqueue(positive(3), 1, Reason::Clause(ClauseReference::new(0)));

        let unassigned = assignments.synchronise(1);

        assert_eq!(unassigned, vec![positive(2)]);
        assert!(assignments.is_literal_assigned_true(positive(3)));
        assert_eq!(assignments.num_trail_entries(), 3);
        assert_eq!(assignments.get_trail_entry(2), positive(3));
    }
}
