mod clause_reference;
mod constraint_operation_error;
mod key_value_heap;
mod literal;
mod moving_averages;
mod variable;

pub use clause_reference::ClauseReference;
pub use constraint_operation_error::ConstraintOperationError;
pub use key_value_heap::KeyValueHeap;
pub use literal::Literal;
pub use moving_averages::CumulativeMovingAverage;
pub use variable::Variable;

use fnv::FnvBuildHasher;

pub type HashMap<K, V, Hasher = FnvBuildHasher> = std::collections::HashMap<K, V, Hasher>;
pub type HashSet<K, Hasher = FnvBuildHasher> = std::collections::HashSet<K, Hasher>;
