//! Test specifications and per-trial measurement models

use crate::types::{Direction, PayloadBucket, TestKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Bytes requested by a latency probe
pub const LATENCY_PROBE_BYTES: u64 = 1;

/// One unit of work produced by the matrix builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestSpec {
    kind: TestKind,
    bucket: Option<PayloadBucket>,
    payload_size_bytes: u64,
    repetitions: u32,
}

impl TestSpec {
    /// Latency probes carry no payload
    pub fn latency(repetitions: u32) -> Self {
        Self {
            kind: TestKind::Latency,
            bucket: None,
            payload_size_bytes: 0,
            repetitions,
        }
    }

    /// Download or upload trials of one bucket
    pub fn throughput(direction: Direction, bucket: PayloadBucket, repetitions: u32) -> Self {
        Self {
            kind: direction.kind(),
            bucket: Some(bucket),
            payload_size_bytes: bucket.size_bytes(),
            repetitions,
        }
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn bucket(&self) -> Option<PayloadBucket> {
        self.bucket
    }

    pub fn direction(&self) -> Option<Direction> {
        self.kind.direction()
    }

    pub fn payload_size_bytes(&self) -> u64 {
        self.payload_size_bytes
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Bytes actually requested on the wire for one trial
    pub fn wire_bytes(&self) -> u64 {
        match self.kind {
            TestKind::Latency => LATENCY_PROBE_BYTES,
            TestKind::Download | TestKind::Upload => self.payload_size_bytes,
        }
    }
}

impl fmt::Display for TestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bucket {
            Some(bucket) => write!(f, "{} {} x{}", self.kind, bucket, self.repetitions),
            None => write!(f, "{} x{}", self.kind, self.repetitions),
        }
    }
}

/// Output of a single timed probe.
///
/// Not `Clone`: a sample belongs to the trial that produced it
/// until it is consumed by a calculator.
#[derive(Debug, PartialEq)]
pub struct RawSample {
    /// Client-measured wall-clock time, from a monotonic clock
    pub elapsed_seconds: f64,
    /// Server-reported processing time, 0 when not reported
    pub server_time_seconds: f64,
    pub bytes_transferred: u64,
}

impl RawSample {
    pub fn new(elapsed: Duration, server_time: Duration, bytes_transferred: u64) -> Self {
        Self {
            elapsed_seconds: elapsed.as_secs_f64(),
            server_time_seconds: server_time.as_secs_f64(),
            bytes_transferred,
        }
    }

    /// Elapsed time with server processing removed; may be negative on anomalies
    pub fn corrected_seconds(&self) -> f64 {
        self.elapsed_seconds - self.server_time_seconds
    }
}

/// Round-trip time minus server processing time, always non-negative
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct CorrectedLatency(f64);

impl CorrectedLatency {
    /// `Err` carries the offending negative value so callers can report it
    pub fn from_sample(sample: RawSample) -> Result<Self, f64> {
        Self::from_seconds(sample.corrected_seconds())
    }

    pub fn from_seconds(seconds: f64) -> Result<Self, f64> {
        if seconds.is_finite() && seconds >= 0.0 {
            Ok(Self(seconds))
        } else {
            Err(seconds)
        }
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }
}

/// Bit rate of one throughput trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub direction: Direction,
    pub bucket: PayloadBucket,
    pub bits_per_second: f64,
}

impl ThroughputSample {
    /// `Err` carries the non-positive corrected duration
    pub fn from_sample(direction: Direction, bucket: PayloadBucket, sample: RawSample) -> Result<Self, f64> {
        let seconds = sample.corrected_seconds();
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(seconds);
        }
        Ok(Self {
            direction,
            bucket,
            bits_per_second: sample.bytes_transferred as f64 * 8.0 / seconds,
        })
    }
}
