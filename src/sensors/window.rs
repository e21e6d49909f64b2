//! Fixed-length sample window backing each channel's chart
//!
//! The dashboard chart renders a constant number of points per channel, so
//! the window is zero-filled at construction and every insert evicts the
//! oldest sample. Length never changes after construction.

use std::collections::VecDeque;

/// Sliding window of numeric samples with invariant length.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SampleWindow {
    /// Create a window holding `capacity` zeros.
    ///
    /// Callers must validate `capacity > 0` beforehand (config load does);
    /// a zero-capacity window cannot hold the invariant.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "window capacity must be > 0");
        let mut samples = VecDeque::with_capacity(capacity);
        samples.extend(std::iter::repeat(0.0).take(capacity));
        Self { samples, capacity }
    }

    /// Push a sample at the newest end and evict the oldest.
    ///
    /// The push/evict pair is a single operation: observers never see the
    /// window at any length other than `capacity`.
    pub fn record(&mut self, value: f64) {
        self.samples.push_back(value);
        self.samples.pop_front();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest sample in the window.
    pub fn latest(&self) -> f64 {
        *self.samples.back().expect("window is never empty")
    }

    /// Oldest sample still in the window.
    pub fn oldest(&self) -> f64 {
        *self.samples.front().expect("window is never empty")
    }

    /// Samples oldest-first, the order charts draw them.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Owned copy of the samples, oldest-first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}
