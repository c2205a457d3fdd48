/// The options which are used by the solver to determine when a restart should
/// occur.
///
/// The strategy is a geometric series over conflicts: the first restart
/// triggers after `base_interval` conflicts and every subsequent interval is
/// multiplied by `growth_factor`. Restarts cancel all decisions while keeping
/// the learned clauses and variable activities.
#[derive(Debug, Clone, Copy)]
pub struct RestartOptions {
    /// The number of conflicts before the first restart.
    pub base_interval: u64,
    /// The multiplier applied to the conflict interval on every restart.
    pub growth_factor: f64,
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self {
            base_interval: 100,
            growth_factor: 1.5,
        }
    }
}

#[derive(Debug)]
pub(crate) struct RestartStrategy {
    options: RestartOptions,
    /// The number of conflicts encountered since the last restart.
    num_conflicts_until_restart: f64,
    num_conflicts_encountered_since_restart: u64,
    num_restarts: u64,
}

impl RestartStrategy {
    pub(crate) fn new(options: RestartOptions) -> Self {
        RestartStrategy {
            options,
            num_conflicts_until_restart: options.base_interval as f64,
            num_conflicts_encountered_since_restart: 0,
            num_restarts: 0,
        }
    }

    pub(crate) fn notify_conflict(&mut self) {
        self.num_conflicts_encountered_since_restart += 1;
    }

    pub(crate) fn should_restart(&self) -> bool {
        self.num_conflicts_encountered_since_restart as f64 >= self.num_conflicts_until_restart
    }

    pub(crate) fn notify_restart(&mut self) {
        self.num_restarts += 1;
        self.num_conflicts_encountered_since_restart = 0;
        self.num_conflicts_until_restart *= self.options.growth_factor;
    }

    pub(crate) fn num_restarts(&self) -> u64 {
        self.num_restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_first_restart_triggers_after_the_base_interval() {
        let mut strategy = RestartStrategy::new(RestartOptions::default());

        for _ in 0..99 {
            strategy.notify_conflict();
        }
        assert!(!strategy.should_restart());

        strategy.notify_conflict();
        assert!(strategy.should_restart());
    }

    #[test]
    fn intervals_grow_geometrically() {
        let mut strategy = RestartStrategy::new(RestartOptions::default());

        for _ in 0..100 {
            strategy.notify_conflict();
        }
        strategy.notify_restart();
        assert_eq!(strategy.num_restarts(), 1);

        // The next interval is 150 conflicts.
        for _ in 0..149 {
            strategy.notify_conflict();
        }
        assert!(!strategy.should_restart());
        strategy.notify_conflict();
        assert!(strategy.should_restart());
    }
}
