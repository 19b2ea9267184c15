//! Temporal smoothing and running tallies shared by the analyzers
//!
//! Per-frame landmark output jitters from frame to frame. Each analyzer damps
//! that noise with a bounded window of recent values and keeps a monotonic
//! tally of counted frames for the session score.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded FIFO of the most recent per-frame values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> SmoothingWindow<T> {
    /// Create a window holding at most `capacity` values (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, evicting the oldest once the window is full
    pub fn push(&mut self, value: T) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

impl SmoothingWindow<bool> {
    /// Fraction of `true` values, `None` while the window is empty
    pub fn ratio(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let hits = self.values.iter().filter(|v| **v).count();
        Some(hits as f64 / self.values.len() as f64)
    }
}

/// Linearly increasing weights from 0.5 (oldest) to 1.0 (newest), normalized to sum 1
pub fn recency_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let raw: Vec<f64> = if n == 1 {
        vec![0.5]
    } else {
        let step = 0.5 / (n - 1) as f64;
        (0..n).map(|i| 0.5 + step * i as f64).collect()
    };
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

impl SmoothingWindow<f64> {
    /// Recency-weighted average, `None` while the window is empty
    pub fn weighted_average(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let weights = recency_weights(self.values.len());
        Some(
            self.values
                .iter()
                .zip(weights.iter())
                .map(|(v, w)| v * w)
                .sum(),
        )
    }
}

/// Session-long frame counters for one analyzer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTally {
    pub total_frames: u32,
    pub good_frames: u32,
}

impl RunningTally {
    /// Count one processed frame
    pub fn record(&mut self, good: bool) {
        self.total_frames += 1;
        if good {
            self.good_frames += 1;
        }
    }

    /// `100 × good / total`, or 0.0 when no frame was processed
    pub fn percentage(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.good_frames as f64 * 100.0 / self.total_frames as f64
    }
}

/// Round to a fixed number of decimals for reporting
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
