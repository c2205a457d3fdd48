use super::assignments::Assignments;
use crate::basic_types::KeyValueHeap;
use crate::basic_types::Literal;
use crate::basic_types::Variable;

/// The VSIDS-style branching heuristic: a max-heap of variables keyed by a
/// floating activity, together with the preferred sign to branch on.
///
/// Decaying activities is implemented by growing the increment applied on a
/// bump, which is cheaper than touching every stored value; once the increment
/// would push an activity past the threshold, all values are rescaled.
#[derive(Debug)]
pub(crate) struct VariableSelector {
    heap: KeyValueHeap,
    /// The sign used when branching on a variable; freshly interned variables
    /// start with the negative phase and the host can override the preference
    /// per variable.
    default_polarity: Vec<bool>,
    increment: f64,
    max_threshold: f64,
    decay_factor: f64,
}

impl VariableSelector {
    pub(crate) fn new(max_threshold: f64, decay_factor: f64) -> VariableSelector {
        VariableSelector {
            heap: KeyValueHeap::default(),
            default_polarity: vec![],
            increment: 1.0,
            max_threshold,
            decay_factor,
        }
    }

    /// Registers a freshly allocated variable with activity zero.
    pub(crate) fn grow(&mut self) {
        self.heap
            .grow(Variable::new(self.default_polarity.len() as u32), 0.0);
        self.default_polarity.push(false);
    }

    pub(crate) fn bump_activity(&mut self, variable: Variable) {
        let activity = self.heap.get_value(variable);
        if activity + self.increment >= self.max_threshold {
            self.heap.divide_values(self.max_threshold);
            self.increment /= self.max_threshold;
        }
        self.heap.increment(variable, self.increment);
    }

    /// Decaying is implemented as increasing the increment so that future
    /// bumps are more impactful.
    pub(crate) fn decay_activities(&mut self) {
        self.increment *= 1.0 / self.decay_factor;
    }

    /// Makes an unassigned variable eligible for branching again.
    pub(crate) fn restore(&mut self, variable: Variable) {
        self.heap.restore(variable);
    }

    pub(crate) fn set_default_polarity(&mut self, variable: Variable, polarity: bool) {
        self.default_polarity[variable] = polarity;
    }

    /// Pops the unassigned variable with the highest activity and returns the
    /// literal to branch on, or `None` if every variable is assigned.
    ///
    /// The heap is maintained lazily: assigned variables encountered at the
    /// top are dropped here and restored on backtracking.
    pub(crate) fn next_decision(&mut self, assignments: &Assignments) -> Option<Literal> {
        loop {
            let candidate = self.heap.peek_max()?;
            let _ = self.heap.pop_max();
            if !assignments.is_variable_assigned(candidate) {
                return Some(Literal::new(candidate, self.default_polarity[candidate]));
            }
        }
    }
}
