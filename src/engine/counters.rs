use log::info;

use crate::basic_types::CumulativeMovingAverage;

/// A set of counters updated during the search.
#[derive(Default, Debug, Copy, Clone)]
pub struct Counters {
    pub num_decisions: u64,
    pub num_conflicts: u64,
    pub num_propagations: u64,
    pub num_restarts: u64,
    /// The number of literals removed from learned clauses by minimisation.
    pub num_minimised_away: u64,
    pub num_unit_clauses_learned: u64,
    pub average_learned_clause_length: CumulativeMovingAverage,
    pub average_backtrack_amount: CumulativeMovingAverage,
}

impl Counters {
    pub fn log_statistics(&self) {
        info!("Number of decisions: {}", self.num_decisions);
        info!("Number of conflicts: {}", self.num_conflicts);
        info!("Number of propagations: {}", self.num_propagations);
        info!("Number of restarts: {}", self.num_restarts);
        info!(
            "Number of literals removed by minimisation: {}",
            self.num_minimised_away
        );
        info!(
            "Number of learned unit clauses: {}",
            self.num_unit_clauses_learned
        );
        info!(
            "Average learned clause length: {}",
            self.average_learned_clause_length.value()
        );
        info!(
            "Average backtrack amount: {}",
            self.average_backtrack_amount.value()
        );
    }
}
