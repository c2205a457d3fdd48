use thiserror::Error;

/// Errors which can occur when adding clauses to the solver.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintOperationError {
    #[error("Adding the clause failed because it is infeasible at the root")]
    InfeasibleClause,
    #[error("Adding a constraint failed because the solver is in an infeasible state")]
    InfeasibleState,
}
