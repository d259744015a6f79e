//! Statistical calculations for latency, jitter and throughput

pub mod throughput;

pub use throughput::{BucketSummary, ThroughputAggregator};

use crate::models::metrics::{CorrectedLatency, RawSample};
use serde::{Deserialize, Serialize};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentile (0-100) of unsorted values, interpolating linearly between
/// the two nearest ranks. `None` for an empty slice.
pub fn percentile(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(calculate_percentile(&sorted, percentile))
}

/// Percentile of an already sorted, non-empty slice
fn calculate_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    let index = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        lower_value + weight * (upper_value - lower_value)
    }
}

/// Mean absolute difference between consecutive samples in arrival order.
/// Undefined (`None`) for fewer than two samples.
pub fn jitter(samples: &[f64]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .collect();
    mean(&diffs)
}

/// Latency point estimate and jitter, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Arithmetic mean of the corrected samples
    pub latency_seconds: f64,
    pub jitter_seconds: Option<f64>,
    pub sample_count: usize,
}

/// Collects corrected latency samples in arrival order
#[derive(Debug, Default)]
pub struct LatencyCalculator {
    samples: Vec<CorrectedLatency>,
    dropped: usize,
}

impl LatencyCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw sample in. A negative corrected latency is dropped and
    /// returned as `Err` so the caller can warn about it.
    pub fn record(&mut self, sample: RawSample) -> Result<CorrectedLatency, f64> {
        match CorrectedLatency::from_sample(sample) {
            Ok(latency) => {
                self.samples.push(latency);
                Ok(latency)
            }
            Err(value) => {
                self.dropped += 1;
                Err(value)
            }
        }
    }

    pub fn push(&mut self, latency: CorrectedLatency) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// `None` when no sample survived
    pub fn summary(&self) -> Option<LatencySummary> {
        let seconds: Vec<f64> = self.samples.iter().map(CorrectedLatency::seconds).collect();
        let latency_seconds = mean(&seconds)?;
        Some(LatencySummary {
            latency_seconds,
            jitter_seconds: jitter(&seconds),
            sample_count: seconds.len(),
        })
    }
}
