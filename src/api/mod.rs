//! The public surface of the crate, re-exported at the crate root.

mod outputs;

pub use outputs::SatisfactionResult;
pub use outputs::Satisfiable;
pub use outputs::Unsatisfiable;

pub use crate::basic_types::ClauseReference;
pub use crate::basic_types::ConstraintOperationError;
pub use crate::basic_types::CumulativeMovingAverage;
pub use crate::basic_types::Literal;
pub use crate::basic_types::Variable;
pub use crate::engine::counters::Counters;
pub use crate::engine::learned_clause_manager::LearningOptions;
pub use crate::engine::restart_strategy::RestartOptions;
pub use crate::engine::solver::CdclSolver;
pub use crate::engine::solver::SolverOptions;
pub use crate::engine::solver::SolverSize;
pub use crate::engine::solver::UndecidedLiteral;
pub use crate::engine::termination::CancelFlag;
pub use crate::engine::termination::Indefinite;
pub use crate::engine::termination::TerminationCondition;
