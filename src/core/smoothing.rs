//! Sliding-window RMS smoothing of raw channel values.
//!
//! Every raw sample is pushed into a bounded FIFO and a root-mean-square
//! value is computed per channel over the whole window. The mean is always
//! taken over the configured window size, even while the window is still
//! filling up, so the first `window - 1` outputs are attenuated.

use std::collections::VecDeque;

/// Bounded per-channel sample history producing RMS readings.
#[derive(Debug, Clone)]
pub struct RmsSmoother {
    /// Configured window size (W)
    window_size: usize,
    /// Channels per sample (N)
    channels: usize,
    /// Most recent samples, oldest first
    window: VecDeque<Vec<i32>>,
}

impl RmsSmoother {
    /// Create a smoother over `window_size` samples of `channels` channels.
    pub fn new(window_size: usize, channels: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            channels,
            window: VecDeque::with_capacity(window_size),
        }
    }

    /// Push one raw sample and return the smoothed reading.
    ///
    /// Missing channels are treated as zero, extra channels are ignored.
    pub fn ingest(&mut self, channels: &[i32]) -> Vec<f64> {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        let mut sample = channels.to_vec();
        sample.resize(self.channels, 0);
        self.window.push_back(sample);

        self.current()
    }

    /// RMS of the current window contents, normalized by the window size.
    pub fn current(&self) -> Vec<f64> {
        let w = self.window_size as f64;
        (0..self.channels)
            .map(|ch| {
                let total: f64 = self
                    .window
                    .iter()
                    .map(|s| {
                        let v = s[ch] as f64;
                        v * v
                    })
                    .sum();
                (total / w).sqrt()
            })
            .collect()
    }

    /// Drop all buffered samples.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_stream_converges() {
        let mut smoother = RmsSmoother::new(50, 8);
        let sample = [10; 8];

        for i in 1..=200 {
            let out = smoother.ingest(&sample);
            if i < 50 {
                assert!(out.iter().all(|&v| v < 10.0), "sample {i}: {out:?}");
            } else {
                assert!(out.iter().all(|&v| v == 10.0), "sample {i}: {out:?}");
            }
        }
    }

    #[test]
    fn test_partial_window_uses_full_size() {
        let mut smoother = RmsSmoother::new(4, 1);
        let out = smoother.ingest(&[2]);
        // sqrt(4 / 4)
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_negative_values() {
        let mut smoother = RmsSmoother::new(5, 2);
        for _ in 0..5 {
            smoother.ingest(&[-7, 3]);
        }
        assert_eq!(smoother.current(), vec![7.0, 3.0]);
    }

    #[test]
    fn test_zero_stream() {
        let mut smoother = RmsSmoother::new(50, 8);
        for _ in 0..75 {
            assert!(smoother.ingest(&[0; 8]).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_window_is_bounded() {
        let mut smoother = RmsSmoother::new(3, 1);
        for _ in 0..3 {
            smoother.ingest(&[100]);
        }
        // Three zeros push every 100 out
        for _ in 0..3 {
            smoother.ingest(&[0]);
        }
        assert_eq!(smoother.len(), 3);
        assert_eq!(smoother.current(), vec![0.0]);
    }

    #[test]
    fn test_clear() {
        let mut smoother = RmsSmoother::new(10, 8);
        smoother.ingest(&[5; 8]);
        smoother.clear();
        assert!(smoother.is_empty());
        assert!(smoother.current().iter().all(|&v| v == 0.0));
    }
}
