//! Majority-vote smoothing of classifier output.

use crate::core::classifier::SvmClassifier;
use std::collections::VecDeque;

/// Sliding window of reduced samples voted on by a classifier.
///
/// No label is produced until the window has received more samples than
/// its size. After that, every buffered sample is classified and the most
/// frequent label wins; on a tie, the label seen first while tallying wins.
#[derive(Debug, Clone)]
pub struct VoteWindow {
    size: usize,
    window: VecDeque<Vec<f64>>,
    /// Set once the window has overflowed for the first time
    primed: bool,
}

impl VoteWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            window: VecDeque::with_capacity(size + 1),
            primed: false,
        }
    }

    /// Buffer one sample and return the voted label, if eligible.
    pub fn classify(&mut self, classifier: &SvmClassifier, sample: &[f64]) -> Option<String> {
        self.window.push_back(sample.to_vec());
        if self.window.len() > self.size {
            self.window.pop_front();
            self.primed = true;
        }
        if !self.primed {
            return None;
        }

        majority(self.window.iter().map(|s| classifier.predict(s))).map(str::to_string)
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.primed = false;
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Most frequent label, ties resolved in favor of the first one seen.
pub fn majority<'a, I>(labels: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    // Tallies in first-seen order
    let mut tallies: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match tallies.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => tallies.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in tallies {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}
