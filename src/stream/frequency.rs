//! Rolling sample-rate estimation.

use std::time::Instant;

/// Estimates the sample rate over consecutive blocks of samples.
///
/// Every `block` samples the rate becomes `(block - 1) / elapsed`, where
/// `elapsed` spans the first and last sample of the block, and the block
/// starts over.
#[derive(Debug, Clone)]
pub struct FrequencyTracker {
    block: usize,
    times: Vec<Instant>,
    frequency: f64,
}

impl FrequencyTracker {
    pub fn new(block: usize) -> Self {
        let block = block.max(2);
        Self {
            block,
            times: Vec::with_capacity(block),
            frequency: 0.0,
        }
    }

    /// Record a sample processed now.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Record a sample processed at `at`.
    pub fn tick_at(&mut self, at: Instant) {
        self.times.push(at);
        if self.times.len() >= self.block {
            let first = self.times[0];
            let last = self.times[self.times.len() - 1];
            let elapsed = last.duration_since(first).as_secs_f64();
            if elapsed > 0.0 {
                self.frequency = (self.block - 1) as f64 / elapsed;
            }
            self.times.clear();
        }
    }

    /// Last estimate in Hz, 0 before the first full block.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn reset(&mut self) {
        self.times.clear();
        self.frequency = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rate_from_block() {
        let mut tracker = FrequencyTracker::new(100);
        let start = Instant::now();

        for i in 0..99 {
            tracker.tick_at(start + Duration::from_millis(5 * i));
        }
        assert_eq!(tracker.frequency(), 0.0);

        // 100th sample, 99 intervals of 5 ms
        tracker.tick_at(start + Duration::from_millis(5 * 99));
        assert!((tracker.frequency() - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_held_between_blocks() {
        let mut tracker = FrequencyTracker::new(2);
        let start = Instant::now();
        tracker.tick_at(start);
        tracker.tick_at(start + Duration::from_millis(10));
        assert!((tracker.frequency() - 100.0).abs() < 1e-6);

        // Half a block does not change the estimate
        tracker.tick_at(start + Duration::from_millis(500));
        assert!((tracker.frequency() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut tracker = FrequencyTracker::new(2);
        let start = Instant::now();
        tracker.tick_at(start);
        tracker.tick_at(start + Duration::from_millis(10));
        tracker.reset();
        assert_eq!(tracker.frequency(), 0.0);
    }
}
