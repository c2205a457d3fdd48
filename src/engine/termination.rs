//! A [`TerminationCondition`] is polled by the solver during the search. It
//! indicates when the solver should stop even though no conclusion has been
//! reached; the solver then reports an unknown outcome. The engine itself
//! never consults clocks or signals.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// The condition by which the host can interrupt a running solve.
pub trait TerminationCondition {
    /// Returns `true` when the solver should stop searching.
    fn should_stop(&mut self) -> bool;
}

/// A [`TerminationCondition`] which never triggers.
#[derive(Clone, Copy, Debug)]
pub struct Indefinite;

impl TerminationCondition for Indefinite {
    fn should_stop(&mut self) -> bool {
        false
    }
}

/// A cooperative cancellation flag. The host keeps a clone and raises it from
/// another thread; the solver polls it at the top of the search loop.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl TerminationCondition for CancelFlag {
    fn should_stop(&mut self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
