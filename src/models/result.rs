//! Final result record and run report

use crate::error::TrialErrorKind;
use crate::types::{Direction, PayloadBucket, TestKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the `TestResult` key set
pub const RESULT_SCHEMA_VERSION: u32 = 1;

/// Descriptive fields from the service's metadata endpoint, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMetadata {
    pub ip: Option<String>,
    pub isp: Option<String>,
    pub location_code: Option<String>,
    pub location_city: Option<String>,
    pub location_region: Option<String>,
}

/// Aggregated measurement record.
///
/// A bucket field is present only when that bucket was requested and
/// produced at least one usable sample. Absent fields are omitted from
/// serialized output. Throughput is always in bits per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_seconds: Option<f64>,

    #[serde(rename = "100KB_down_bps", default, skip_serializing_if = "Option::is_none")]
    pub down_100kb_bps: Option<f64>,
    #[serde(rename = "1MB_down_bps", default, skip_serializing_if = "Option::is_none")]
    pub down_1mb_bps: Option<f64>,
    #[serde(rename = "10MB_down_bps", default, skip_serializing_if = "Option::is_none")]
    pub down_10mb_bps: Option<f64>,
    #[serde(rename = "25MB_down_bps", default, skip_serializing_if = "Option::is_none")]
    pub down_25mb_bps: Option<f64>,

    #[serde(rename = "100KB_up_bps", default, skip_serializing_if = "Option::is_none")]
    pub up_100kb_bps: Option<f64>,
    #[serde(rename = "1MB_up_bps", default, skip_serializing_if = "Option::is_none")]
    pub up_1mb_bps: Option<f64>,
    #[serde(rename = "10MB_up_bps", default, skip_serializing_if = "Option::is_none")]
    pub up_10mb_bps: Option<f64>,
    #[serde(rename = "25MB_up_bps", default, skip_serializing_if = "Option::is_none")]
    pub up_25mb_bps: Option<f64>,

    #[serde(rename = "90th_percentile_down_bps", default, skip_serializing_if = "Option::is_none")]
    pub percentile_90_down_bps: Option<f64>,
    #[serde(rename = "90th_percentile_up_bps", default, skip_serializing_if = "Option::is_none")]
    pub percentile_90_up_bps: Option<f64>,
}

impl TestResult {
    /// A record carrying only metadata
    pub fn from_metadata(metadata: TestMetadata) -> Self {
        Self {
            schema_version: RESULT_SCHEMA_VERSION,
            ip: metadata.ip,
            isp: metadata.isp,
            location_code: metadata.location_code,
            location_city: metadata.location_city,
            location_region: metadata.location_region,
            latency_seconds: None,
            jitter_seconds: None,
            down_100kb_bps: None,
            down_1mb_bps: None,
            down_10mb_bps: None,
            down_25mb_bps: None,
            up_100kb_bps: None,
            up_1mb_bps: None,
            up_10mb_bps: None,
            up_25mb_bps: None,
            percentile_90_down_bps: None,
            percentile_90_up_bps: None,
        }
    }

    /// Mean bit rate recorded for a bucket
    pub fn bucket_bps(&self, direction: Direction, bucket: PayloadBucket) -> Option<f64> {
        *self.bucket_field(direction, bucket)
    }

    /// Pooled 90th percentile for a direction
    pub fn percentile_90_bps(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::Down => self.percentile_90_down_bps,
            Direction::Up => self.percentile_90_up_bps,
        }
    }

    /// Result key of a bucket field, e.g. `1MB_down_bps`
    pub fn bucket_key(direction: Direction, bucket: PayloadBucket) -> String {
        format!("{}_{}_bps", bucket.label(), direction.as_str())
    }

    pub(crate) fn set_bucket_bps(&mut self, direction: Direction, bucket: PayloadBucket, value: f64) {
        *self.bucket_field_mut(direction, bucket) = Some(value);
    }

    pub(crate) fn set_percentile_90_bps(&mut self, direction: Direction, value: f64) {
        match direction {
            Direction::Down => self.percentile_90_down_bps = Some(value),
            Direction::Up => self.percentile_90_up_bps = Some(value),
        }
    }

    fn bucket_field(&self, direction: Direction, bucket: PayloadBucket) -> &Option<f64> {
        match (direction, bucket) {
            (Direction::Down, PayloadBucket::Kb100) => &self.down_100kb_bps,
            (Direction::Down, PayloadBucket::Mb1) => &self.down_1mb_bps,
            (Direction::Down, PayloadBucket::Mb10) => &self.down_10mb_bps,
            (Direction::Down, PayloadBucket::Mb25) => &self.down_25mb_bps,
            (Direction::Up, PayloadBucket::Kb100) => &self.up_100kb_bps,
            (Direction::Up, PayloadBucket::Mb1) => &self.up_1mb_bps,
            (Direction::Up, PayloadBucket::Mb10) => &self.up_10mb_bps,
            (Direction::Up, PayloadBucket::Mb25) => &self.up_25mb_bps,
        }
    }

    fn bucket_field_mut(&mut self, direction: Direction, bucket: PayloadBucket) -> &mut Option<f64> {
        match (direction, bucket) {
            (Direction::Down, PayloadBucket::Kb100) => &mut self.down_100kb_bps,
            (Direction::Down, PayloadBucket::Mb1) => &mut self.down_1mb_bps,
            (Direction::Down, PayloadBucket::Mb10) => &mut self.down_10mb_bps,
            (Direction::Down, PayloadBucket::Mb25) => &mut self.down_25mb_bps,
            (Direction::Up, PayloadBucket::Kb100) => &mut self.up_100kb_bps,
            (Direction::Up, PayloadBucket::Mb1) => &mut self.up_1mb_bps,
            (Direction::Up, PayloadBucket::Mb10) => &mut self.up_10mb_bps,
            (Direction::Up, PayloadBucket::Mb25) => &mut self.up_25mb_bps,
        }
    }
}

/// A requested test that produced no usable samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSpec {
    pub kind: TestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<PayloadBucket>,
    /// Trials that were requested
    pub attempted: u32,
    /// Last failure observed across the spec's trials
    pub last_error: Option<TrialErrorKind>,
}

impl FailedSpec {
    pub fn describe(&self) -> String {
        let target = match self.bucket {
            Some(bucket) => format!("{} {}", self.kind, bucket),
            None => self.kind.to_string(),
        };
        match self.last_error {
            Some(kind) => format!("{}: 0 of {} trials usable (last error: {})", target, self.attempted, kind),
            None => format!("{}: 0 of {} trials usable", target, self.attempted),
        }
    }
}

/// Everything a run hands to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Correlation ID of this run, shared with log entries
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub result: TestResult,
    /// Requested tests with zero usable trials
    pub failures: Vec<FailedSpec>,
    /// Number of test specifications that were requested
    pub requested_specs: usize,
    pub cancelled: bool,
}

impl RunReport {
    /// Every requested test produced data and nothing was cancelled
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Some but not all requested tests produced data
    pub fn is_partial(&self) -> bool {
        !self.is_complete() && !self.all_failed()
    }

    /// Nothing usable was measured although something was requested
    pub fn all_failed(&self) -> bool {
        self.requested_specs > 0 && self.failures.len() >= self.requested_specs
    }
}
