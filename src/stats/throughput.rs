//! Per-bucket throughput aggregation and pooled percentiles

use super::{mean, percentile};
use crate::models::metrics::{RawSample, ThroughputSample};
use crate::types::{Direction, PayloadBucket};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentile reported across all buckets of a direction
pub const POOLED_PERCENTILE: f64 = 90.0;

/// Summary of one bucket's usable trials
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub direction: Direction,
    pub bucket: PayloadBucket,
    /// Mean of the per-trial rates
    pub mean_bps: f64,
    pub sample_count: usize,
}

#[derive(Debug, Default)]
struct BucketRates {
    rates: Vec<f64>,
    dropped: usize,
}

/// Stores per-trial bit rates by (direction, bucket).
///
/// Owned by the runner and mutated only from its sequential fold loop.
#[derive(Debug, Default)]
pub struct ThroughputAggregator {
    buckets: BTreeMap<(Direction, PayloadBucket), BucketRates>,
}

impl ThroughputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a raw trial sample in. A non-positive corrected duration is
    /// dropped and returned as `Err`.
    pub fn record(&mut self, direction: Direction, bucket: PayloadBucket, sample: RawSample) -> Result<ThroughputSample, f64> {
        match ThroughputSample::from_sample(direction, bucket, sample) {
            Ok(throughput) => {
                self.push(throughput);
                Ok(throughput)
            }
            Err(seconds) => {
                self.buckets.entry((direction, bucket)).or_default().dropped += 1;
                Err(seconds)
            }
        }
    }

    pub fn push(&mut self, sample: ThroughputSample) {
        self.buckets
            .entry((sample.direction, sample.bucket))
            .or_default()
            .rates
            .push(sample.bits_per_second);
    }

    /// Usable trial count for a bucket
    pub fn sample_count(&self, direction: Direction, bucket: PayloadBucket) -> usize {
        self.buckets
            .get(&(direction, bucket))
            .map_or(0, |b| b.rates.len())
    }

    pub fn dropped(&self, direction: Direction, bucket: PayloadBucket) -> usize {
        self.buckets.get(&(direction, bucket)).map_or(0, |b| b.dropped)
    }

    /// Mean rate of one bucket, `None` without usable trials
    pub fn bucket_mean(&self, direction: Direction, bucket: PayloadBucket) -> Option<f64> {
        self.buckets
            .get(&(direction, bucket))
            .and_then(|b| mean(&b.rates))
    }

    /// Summaries of every bucket with at least one usable trial, smallest bucket first
    pub fn summaries(&self, direction: Direction) -> Vec<BucketSummary> {
        self.buckets
            .iter()
            .filter(|((d, _), _)| *d == direction)
            .filter_map(|((d, bucket), rates)| {
                mean(&rates.rates).map(|mean_bps| BucketSummary {
                    direction: *d,
                    bucket: *bucket,
                    mean_bps,
                    sample_count: rates.rates.len(),
                })
            })
            .collect()
    }

    /// Every individual trial rate of a direction, across all buckets
    pub fn pooled_rates(&self, direction: Direction) -> Vec<f64> {
        self.buckets
            .iter()
            .filter(|((d, _), _)| *d == direction)
            .flat_map(|(_, b)| b.rates.iter().copied())
            .collect()
    }

    /// Interpolated 90th percentile over the pooled rates; `None` without samples
    pub fn percentile_90(&self, direction: Direction) -> Option<f64> {
        percentile(&self.pooled_rates(direction), POOLED_PERCENTILE)
    }
}
