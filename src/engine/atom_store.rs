use crate::basic_types::HashMap;
use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::theory::Polarity;
use crate::theory::TheoryFormula;

/// Interns host formulas into engine variables.
///
/// Formulas are canonicalised through [`TheoryFormula::normalise`] before the
/// lookup, so a formula and its negation always map to the two literals of the
/// same variable. Interning never propagates; growing the solver structures
/// for fresh variables is the solver's responsibility.
#[derive(Debug)]
pub(crate) struct AtomStore<F> {
    interned: HashMap<F, Variable>,
    /// The canonical formula of each variable, indexed by the variable.
    formulas: Vec<F>,
}

impl<F> Default for AtomStore<F> {
    fn default() -> Self {
        AtomStore {
            interned: HashMap::default(),
            formulas: vec![],
        }
    }
}

impl<F: TheoryFormula> AtomStore<F> {
    pub(crate) fn intern(&mut self, formula: &F) -> Literal {
        let (canonical, polarity) = formula.normalise();
        let variable = match self.interned.get(&canonical) {
            Some(variable) => *variable,
            None => {
                let variable = Variable::new(self.formulas.len() as u32);
                let _ = self.interned.insert(canonical.clone(), variable);
                self.formulas.push(canonical);
                variable
            }
        };
        Literal::new(variable, polarity == Polarity::SameSign)
    }

    /// Looks a formula up without creating a variable for it.
    pub(crate) fn lookup(&self, formula: &F) -> Option<Literal> {
        let (canonical, polarity) = formula.normalise();
        self.interned
            .get(&canonical)
            .map(|variable| Literal::new(*variable, polarity == Polarity::SameSign))
    }

    /// The formula a literal stands for; the canonical formula for positive
    /// literals and its negation otherwise.
    pub(crate) fn formula(&self, literal: Literal) -> F {
        let canonical = &self.formulas[literal.variable()];
        if literal.is_positive() {
            canonical.clone()
        } else {
            canonical.negated()
        }
    }

    pub(crate) fn num_variables(&self) -> u32 {
        self.formulas.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_formula_and_its_negation_intern_to_the_same_variable() {
        let mut atoms: AtomStore<i32> = AtomStore::default();

        let positive = atoms.intern(&3);
        let negative = atoms.intern(&-3);

        assert_eq!(positive.variable(), negative.variable());
        assert_eq!(!positive, negative);
        assert_eq!(atoms.num_variables(), 1);
    }

    #[test]
    fn interning_is_idempotent() {
        let mut atoms: AtomStore<i32> = AtomStore::default();

        let first = atoms.intern(&5);
        let second = atoms.intern(&5);

        assert_eq!(first, second);
        assert_eq!(atoms.num_variables(), 1);
    }

    #[test]
    fn formulas_round_trip_through_literals() {
        let mut atoms: AtomStore<i32> = AtomStore::default();

        let literal = atoms.intern(&-7);
        assert_eq!(atoms.formula(literal), -7);
        assert_eq!(atoms.formula(!literal), 7);
    }
}
