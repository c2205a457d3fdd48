//! Conflict analysis: First-UIP resolution with clause minimisation.
//!
//! Starting from a conflicting clause, the analyser walks the trail backwards
//! resolving against reason clauses until a single literal of the conflict
//! level remains (the first unique implication point). Literals assigned below
//! the conflict level enter the learnt clause, root-level literals are
//! resolved away outright, and the remaining literals of the learnt clause are
//! subjected to a recursive redundancy check. When proof storage is enabled,
//! every clause used in the resolution is recorded so the learnt clause
//! carries a replayable history.

use std::collections::BinaryHeap;

use super::assignments::Assignments;
use super::clause::Premise;
use super::clause_allocator::ClauseAllocator;
use super::counters::Counters;
use super::learned_clause_manager::LearnedClauseManager;
use super::reason::Reason;
use super::variable_selector::VariableSelector;
use crate::basic_types::ClauseReference;
use crate::basic_types::HashMap;
use crate::basic_types::HashSet;
use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;
use crate::theory::Theory;

/// Used during conflict analysis to provide the necessary information.
pub(crate) struct ConflictAnalysisContext<'a, Th: Theory> {
    pub(crate) assignments: &'a mut Assignments,
    pub(crate) clause_allocator: &'a mut ClauseAllocator<Th::Lemma>,
    pub(crate) learned_clause_manager: &'a mut LearnedClauseManager,
    pub(crate) variable_selector: &'a mut VariableSelector,
    pub(crate) counters: &'a mut Counters,
    pub(crate) theory: &'a mut Th,
    pub(crate) unit_proof_cache: &'a mut HashMap<Variable, ClauseReference>,
    pub(crate) store_proof: bool,
    pub(crate) learning_clause_minimisation: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ConflictAnalysisResult {
    /// The learnt clause; the asserting literal is at position zero and the
    /// remaining literals are sorted by descending assignment level.
    pub(crate) learned_literals: Vec<Literal>,
    pub(crate) backjump_level: usize,
    /// The clauses resolved to derive the learnt clause, in resolution order
    /// with the conflicting clause at the head. Empty when proofs are off.
    pub(crate) history: Vec<ClauseReference>,
}

/// Returns the literal of `variable` which is currently assigned true.
fn assigned_literal(assignments: &Assignments, variable: Variable) -> Literal {
    let positive = Literal::new(variable, true);
    if assignments.is_literal_assigned_true(positive) {
        positive
    } else {
        marrow_assert_moderate!(assignments.is_literal_assigned_true(!positive));
        !positive
    }
}

/// Returns the clause which propagated `literal`, materialising the
/// explanation of a lazy theory propagation on first use. The materialised
/// clause replaces the stored reason, so the theory is asked at most once per
/// propagation.
pub(crate) fn get_reason_clause<Th: Theory>(
    context: &mut ConflictAnalysisContext<'_, Th>,
    literal: Literal,
) -> ClauseReference {
    marrow_assert_moderate!(context.assignments.is_literal_assigned_true(literal));
    match context.assignments.get_variable_reason(literal.variable()) {
        Reason::Clause(reference) => {
            marrow_assert_moderate!(context.clause_allocator[reference][0] == literal);
            reference
        }
        Reason::TheoryLazy(code) => {
            let (antecedents, lemma) = context.theory.explain_propagation(code);
            let mut literals = Vec::with_capacity(antecedents.len() + 1);
            literals.push(literal);
            literals.extend(antecedents.into_iter().map(|antecedent| !antecedent));
            let premise = if context.store_proof {
                Premise::Lemma(lemma)
            } else {
                Premise::Untracked
            };
            let reference = context.clause_allocator.create_clause(literals, true, premise);
            context
                .assignments
                .replace_reason(literal.variable(), Reason::Clause(reference));
            reference
        }
        Reason::Decision => panic!("Decision literal {literal} has no reason clause"),
    }
}

/// Returns a proof of the unit clause `[literal]` for a literal which is true
/// at the root level. If the recorded reason already has length one it is the
/// proof; otherwise a unit clause is materialised whose history resolves the
/// reason against the unit proofs of its antecedents. Results are memoised per
/// variable.
pub(crate) fn atom_unit_proof<Th: Theory>(
    context: &mut ConflictAnalysisContext<'_, Th>,
    literal: Literal,
) -> ClauseReference {
    marrow_assert_moderate!(context.assignments.is_literal_root_assignment(literal));
    marrow_assert_moderate!(context.assignments.is_literal_assigned_true(literal));

    if let Some(reference) = context.unit_proof_cache.get(&literal.variable()) {
        return *reference;
    }

    let reason_reference = get_reason_clause(context, literal);
    let reference = if context.clause_allocator[reason_reference].len() == 1 {
        reason_reference
    } else {
        let tail: Vec<Literal> = context.clause_allocator[reason_reference]
            .get_literal_slice()[1..]
            .to_vec();
        let mut history = Vec::with_capacity(tail.len() + 1);
        history.push(reason_reference);
        let mut processed: Vec<Literal> = vec![];
        for antecedent in tail {
            if processed.contains(&antecedent) {
                continue;
            }
            processed.push(antecedent);
            history.push(atom_unit_proof(context, !antecedent));
        }
        context
            .clause_allocator
            .create_clause(vec![literal], false, Premise::History(history))
    };
    let _ = context.unit_proof_cache.insert(literal.variable(), reference);
    reference
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
enum Label {
    /// The literal belongs to the learnt clause and has not been classified.
    Seen,
    /// The literal cannot be resolved away.
    Poison,
    /// The literal is implied by other literals of the learnt clause.
    Removable,
    /// The literal must stay in the learnt clause.
    Keep,
}

const MAX_MINIMISATION_DEPTH: usize = 500;

/// Performs First-UIP conflict analysis, learnt clause minimisation, and
/// assumption core extraction. The transient variable marks live here and are
/// cleared before every analysis returns.
#[derive(Default, Debug)]
pub(crate) struct ResolutionAnalyser {
    seen: Vec<bool>,
    to_clear: Vec<Variable>,
    labels: HashMap<Variable, Label>,
}

impl ResolutionAnalyser {
    fn accommodate(&mut self, num_variables: u32) {
        if self.seen.len() < num_variables as usize {
            self.seen.resize(num_variables as usize, false);
        }
    }

    fn mark(&mut self, variable: Variable) {
        if !self.seen[variable.index() as usize] {
            self.seen[variable.index() as usize] = true;
            self.to_clear.push(variable);
        }
    }

    fn is_marked(&self, variable: Variable) -> bool {
        self.seen[variable.index() as usize]
    }

    fn clear_marks(&mut self) {
        for variable in self.to_clear.drain(..) {
            self.seen[variable.index() as usize] = false;
        }
        self.labels.clear();
    }

    /// Computes the learnt clause for `conflict` according to the 1UIP scheme.
    ///
    /// The conflict level is the maximum assignment level among the literals
    /// of the conflicting clause; for theory conflicts this may lie below the
    /// current decision level.
    pub(crate) fn compute_1uip<Th: Theory>(
        &mut self,
        conflict: ClauseReference,
        context: &mut ConflictAnalysisContext<'_, Th>,
    ) -> ConflictAnalysisResult {
        self.accommodate(context.assignments.num_variables());

        let conflict_level = context.clause_allocator[conflict]
            .get_literal_slice()
            .iter()
            .map(|literal| context.assignments.get_literal_assignment_level(*literal))
            .max()
            .expect("conflict clauses are non-empty");
        marrow_assert_simple!(conflict_level > 0, "Root conflicts are handled by the search loop");

        // Slot zero is reserved for the asserting literal.
        let mut learned_literals = vec![Literal::u32_to_literal(0)];
        let mut history: Vec<ClauseReference> = vec![];
        let mut path_count: u32 = 0;
        let mut next_clause = Some(conflict);
        let mut trail_index = context.assignments.num_trail_entries();
        let mut roots_in_clause: Vec<Variable> = vec![];

        let asserting_literal = loop {
            if let Some(reference) = next_clause {
                if context.store_proof {
                    history.push(reference);
                }
                if context.clause_allocator[reference].is_removable() {
                    context
                        .learned_clause_manager
                        .bump_clause_activity(reference, context.clause_allocator);
                }
                roots_in_clause.clear();
                let clause_len = context.clause_allocator[reference].len();
                for slot in 0..clause_len {
                    let literal = context.clause_allocator[reference][slot];
                    let variable = literal.variable();

                    let level = context.assignments.get_variable_assignment_level(variable);
                    if level == 0 {
                        // Root facts are resolved away outright. Every clause
                        // mentioning the fact re-introduces it, so the unit
                        // proof is recorded once per clause.
                        if context.store_proof && !roots_in_clause.contains(&variable) {
                            roots_in_clause.push(variable);
                            let unit = atom_unit_proof(context, !literal);
                            history.push(unit);
                        }
                        continue;
                    }

                    // The pivot resolved in the previous step is marked, which
                    // also keeps it out of the learnt clause.
                    if self.is_marked(variable) {
                        continue;
                    }
                    self.mark(variable);

                    if level < conflict_level {
                        learned_literals.push(literal);
                        context.variable_selector.bump_activity(variable);
                    } else {
                        path_count += 1;
                    }
                }
            }

            // Walk the trail backwards to the next literal awaiting resolution,
            // skipping unmarked entries and entries below the conflict level.
            let pivot = loop {
                trail_index -= 1;
                let entry = context.assignments.get_trail_entry(trail_index);
                let variable = entry.variable();
                if self.is_marked(variable)
                    && context.assignments.get_variable_assignment_level(variable)
                        >= conflict_level
                {
                    break entry;
                }
            };

            path_count -= 1;
            if path_count == 0 {
                break pivot;
            }
            next_clause = Some(get_reason_clause(context, pivot));
        };
        learned_literals[0] = !asserting_literal;

        if context.learning_clause_minimisation {
            self.minimise(&mut learned_literals, &mut history, context);
        }

        let assignments = &*context.assignments;
        learned_literals.sort_by(|a, b| {
            assignments
                .get_literal_assignment_level(*b)
                .cmp(&assignments.get_literal_assignment_level(*a))
        });

        let backjump_level = if learned_literals.len() == 1 {
            0
        } else {
            let highest = assignments.get_literal_assignment_level(learned_literals[0]);
            let second = assignments.get_literal_assignment_level(learned_literals[1]);
            if highest > second {
                second
            } else {
                highest.saturating_sub(1)
            }
        };

        self.clear_marks();

        ConflictAnalysisResult {
            learned_literals,
            backjump_level,
            history,
        }
    }

    /// Removes literals from the learnt clause which are implied by the other
    /// literals through the implication graph. The asserting literal at
    /// position zero always stays.
    ///
    /// The implementation is based on the algorithm from the papers:
    /// "Improved conflict-clause minimization leads to improved propositional
    /// proof traces", Allen Van Gelder, SAT'09, and "Minimizing learned
    /// clauses", Niklas Sörensson and Armin Biere, SAT'09.
    fn minimise<Th: Theory>(
        &mut self,
        learned_literals: &mut Vec<Literal>,
        history: &mut Vec<ClauseReference>,
        context: &mut ConflictAnalysisContext<'_, Th>,
    ) {
        if learned_literals.len() <= 1 {
            return;
        }

        let abstract_levels = learned_literals[1..].iter().fold(0u32, |mask, literal| {
            mask | (1u32 << (context.assignments.get_literal_assignment_level(*literal) & 31))
        });

        self.labels.clear();
        let _ = self
            .labels
            .insert(learned_literals[0].variable(), Label::Keep);
        for literal in learned_literals[1..].iter() {
            let variable = literal.variable();
            let label = if context.assignments.is_variable_decision(variable) {
                Label::Keep
            } else {
                Label::Seen
            };
            let _ = self.labels.insert(variable, label);
        }

        let mut removed: Vec<Literal> = vec![];
        let mut end_position: usize = 1;
        for index in 1..learned_literals.len() {
            let literal = learned_literals[index];
            let label = self.compute_label(literal.variable(), abstract_levels, 0, context);
            if label == Label::Removable {
                removed.push(literal);
                context.counters.num_minimised_away += 1;
            } else {
                learned_literals[end_position] = literal;
                end_position += 1;
            }
        }
        learned_literals.truncate(end_position);

        if context.store_proof && !removed.is_empty() {
            self.emit_elimination_chains(&removed, learned_literals, history, context);
        }
    }

    /// Classifies a variable of the implication graph. A variable is removable
    /// iff every antecedent is a root assignment, part of the learnt clause,
    /// or recursively removable — where only decision levels present in the
    /// learnt clause (tracked through `abstract_levels`) may participate.
    fn compute_label<Th: Theory>(
        &mut self,
        variable: Variable,
        abstract_levels: u32,
        depth: usize,
        context: &mut ConflictAnalysisContext<'_, Th>,
    ) -> Label {
        let initial = self.labels.get(&variable).copied();
        if let Some(label) = initial {
            if label != Label::Seen {
                return label;
            }
        }
        let was_in_learned = initial == Some(Label::Seen);

        // The analysis is cut off beyond a reasonable depth.
        if depth >= MAX_MINIMISATION_DEPTH {
            let label = if was_in_learned { Label::Keep } else { Label::Poison };
            let _ = self.labels.insert(variable, label);
            return label;
        }

        if context.assignments.is_variable_decision(variable) {
            let _ = self.labels.insert(variable, Label::Poison);
            return Label::Poison;
        }

        let level = context.assignments.get_variable_assignment_level(variable);
        if (1u32 << (level & 31)) & abstract_levels == 0 {
            let label = if was_in_learned { Label::Keep } else { Label::Poison };
            let _ = self.labels.insert(variable, label);
            return label;
        }

        let true_literal = assigned_literal(context.assignments, variable);
        let reason_reference = get_reason_clause(context, true_literal);
        let clause_len = context.clause_allocator[reason_reference].len();
        for slot in 1..clause_len {
            let antecedent = context.clause_allocator[reason_reference][slot];
            if context.assignments.is_literal_root_assignment(antecedent) {
                continue;
            }
            let label =
                self.compute_label(antecedent.variable(), abstract_levels, depth + 1, context);
            if label == Label::Poison {
                let result = if was_in_learned { Label::Keep } else { Label::Poison };
                let _ = self.labels.insert(variable, result);
                return result;
            }
        }

        let _ = self.labels.insert(variable, Label::Removable);
        Label::Removable
    }

    /// Extends the resolution history so that it also eliminates the removed
    /// literals.
    ///
    /// Eliminations are replayed in order of descending trail position. Every
    /// literal introduced by a reason clause sits strictly below its pivot on
    /// the trail, so no literal is re-introduced after its elimination and
    /// every recorded step resolves exactly one pivot. Root-level antecedents
    /// are eliminated through their unit proofs, which introduce nothing.
    fn emit_elimination_chains<Th: Theory>(
        &mut self,
        removed: &[Literal],
        kept: &[Literal],
        history: &mut Vec<ClauseReference>,
        context: &mut ConflictAnalysisContext<'_, Th>,
    ) {
        let mut trail_position: HashMap<Variable, usize> = HashMap::default();
        for index in 0..context.assignments.num_trail_entries() {
            let entry = context.assignments.get_trail_entry(index);
            let _ = trail_position.insert(entry.variable(), index);
        }

        let kept_variables: HashSet<Variable> =
            kept.iter().map(|literal| literal.variable()).collect();

        let mut queued: HashSet<Variable> =
            removed.iter().map(|literal| literal.variable()).collect();
        let mut queue: BinaryHeap<(usize, u32)> = removed
            .iter()
            .map(|literal| (trail_position[&literal.variable()], literal.to_u32()))
            .collect();

        let mut roots_in_clause: Vec<Literal> = vec![];
        while let Some((_, code)) = queue.pop() {
            let eliminated = Literal::u32_to_literal(code);
            let reason_reference = get_reason_clause(context, !eliminated);
            history.push(reason_reference);

            roots_in_clause.clear();
            let clause_len = context.clause_allocator[reason_reference].len();
            for slot in 1..clause_len {
                let antecedent = context.clause_allocator[reason_reference][slot];
                let antecedent_variable = antecedent.variable();
                if kept_variables.contains(&antecedent_variable) {
                    continue;
                }
                if context.assignments.is_literal_root_assignment(antecedent) {
                    if !roots_in_clause.contains(&antecedent) {
                        roots_in_clause.push(antecedent);
                        let unit = atom_unit_proof(context, !antecedent);
                        history.push(unit);
                    }
                    continue;
                }
                if queued.insert(antecedent_variable) {
                    queue.push((
                        trail_position[&antecedent_variable],
                        antecedent.to_u32(),
                    ));
                }
            }
        }
    }

    /// Computes the subset of assumptions responsible for `failed_assumption`
    /// being false, by expanding propagation reasons backwards along the trail
    /// and collecting the forced decisions they rest on.
    pub(crate) fn compute_assumption_core<Th: Theory>(
        &mut self,
        failed_assumption: Literal,
        context: &mut ConflictAnalysisContext<'_, Th>,
    ) -> Vec<Literal> {
        marrow_assert_simple!(context
            .assignments
            .is_literal_assigned_false(failed_assumption));
        self.accommodate(context.assignments.num_variables());

        let mut core = vec![failed_assumption];
        self.mark(failed_assumption.variable());

        for trail_index in (0..context.assignments.num_trail_entries()).rev() {
            let entry = context.assignments.get_trail_entry(trail_index);
            let variable = entry.variable();
            if !self.is_marked(variable) {
                continue;
            }
            // Everything below is a root fact and independent of assumptions.
            if context.assignments.get_variable_assignment_level(variable) == 0 {
                break;
            }
            if context.assignments.get_variable_reason(variable).is_decision() {
                core.push(entry);
            } else {
                let reference = get_reason_clause(context, entry);
                let clause_len = context.clause_allocator[reference].len();
                for slot in 1..clause_len {
                    let antecedent = context.clause_allocator[reference][slot];
                    if !context.assignments.is_literal_root_assignment(antecedent) {
                        self.mark(antecedent.variable());
                    }
                }
            }
        }

        self.clear_marks();
        core
    }
}
