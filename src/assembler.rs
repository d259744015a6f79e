//! Builds the final result record from metadata and runner measurements

use crate::executor::Measurements;
use crate::models::{RunReport, TestMetadata, TestResult};
use crate::types::Direction;
use chrono::{DateTime, Utc};

/// Merges metadata with calculator outputs; never fails on partial data
pub struct ResultAssembler;

impl ResultAssembler {
    /// Only buckets and tests with usable samples produce fields
    pub fn assemble(metadata: TestMetadata, measurements: &Measurements) -> TestResult {
        let mut result = TestResult::from_metadata(metadata);

        if let Some(summary) = measurements.latency.summary() {
            result.latency_seconds = Some(summary.latency_seconds);
            result.jitter_seconds = summary.jitter_seconds;
        }

        for direction in [Direction::Down, Direction::Up] {
            for bucket in measurements.throughput.summaries(direction) {
                result.set_bucket_bps(direction, bucket.bucket, bucket.mean_bps);
            }
            if let Some(p90) = measurements.throughput.percentile_90(direction) {
                result.set_percentile_90_bps(direction, p90);
            }
        }

        result
    }

    /// Wrap the assembled record with run bookkeeping
    pub fn report(
        run_id: &str,
        started_at: DateTime<Utc>,
        metadata: TestMetadata,
        measurements: Measurements,
    ) -> RunReport {
        let result = Self::assemble(metadata, &measurements);
        RunReport {
            run_id: run_id.to_string(),
            started_at,
            completed_at: Utc::now(),
            result,
            failures: measurements.failures,
            requested_specs: measurements.requested_specs,
            cancelled: measurements.cancelled,
        }
    }
}
