/// Cumulative average over all terms added so far, used for search statistics
/// such as the average conflict clause size.
#[derive(Default, Debug, Copy, Clone)]
pub struct CumulativeMovingAverage {
    sum: u64,
    num_terms: u64,
}

impl CumulativeMovingAverage {
    pub fn add_term(&mut self, new_term: u64) {
        self.sum += new_term;
        self.num_terms += 1;
    }

    pub fn value(&self) -> f64 {
        if self.num_terms > 0 {
            self.sum as f64 / self.num_terms as f64
        } else {
            0.0
        }
    }
}
