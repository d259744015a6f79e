//! Ordered test matrix construction

use crate::error::{AppError, Result};
use crate::models::{config::BucketPlan, TestSpec};
use crate::types::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a run should measure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSelection {
    /// Latency probe count, `None` to skip latency
    pub latency_repetitions: Option<u32>,
    pub download: Vec<BucketPlan>,
    pub upload: Vec<BucketPlan>,
}

impl TestSelection {
    pub fn is_empty(&self) -> bool {
        self.latency_repetitions.is_none() && self.download.is_empty() && self.upload.is_empty()
    }

    fn plans(&self, direction: Direction) -> &[BucketPlan] {
        match direction {
            Direction::Down => &self.download,
            Direction::Up => &self.upload,
        }
    }
}

/// Builds the ordered sequence of test specifications
pub struct TestMatrixBuilder;

impl TestMatrixBuilder {
    /// Latency first, then download buckets smallest first, then upload
    /// buckets smallest first. The same selection always yields the same
    /// sequence.
    pub fn build(selection: &TestSelection) -> Result<Vec<TestSpec>> {
        let mut specs = Vec::new();

        if let Some(repetitions) = selection.latency_repetitions {
            if repetitions == 0 {
                return Err(AppError::config("Latency test requested with zero repetitions"));
            }
            specs.push(TestSpec::latency(repetitions));
        }

        for direction in [Direction::Down, Direction::Up] {
            let mut plans = selection.plans(direction).to_vec();
            let mut seen = HashSet::new();
            for plan in &plans {
                if plan.repetitions == 0 {
                    return Err(AppError::config(format!(
                        "{} {} requested with zero repetitions", direction.kind(), plan.bucket
                    )));
                }
                if !seen.insert(plan.bucket) {
                    return Err(AppError::config(format!(
                        "Bucket {} listed more than once for {}", plan.bucket, direction.kind()
                    )));
                }
            }

            plans.sort_by_key(|plan| plan.bucket);
            specs.extend(
                plans
                    .into_iter()
                    .map(|plan| TestSpec::throughput(direction, plan.bucket, plan.repetitions)),
            );
        }

        Ok(specs)
    }
}
