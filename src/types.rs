//! Type definitions and aliases

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Kind of measurement a test performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    /// Single-byte round trips used for latency and jitter
    Latency,
    /// Download transfer of a bucket-sized payload
    Download,
    /// Upload transfer of a bucket-sized payload
    Upload,
}

impl TestKind {
    /// Transfer direction, if this kind moves a payload
    pub fn direction(self) -> Option<Direction> {
        match self {
            TestKind::Latency => None,
            TestKind::Download => Some(Direction::Down),
            TestKind::Upload => Some(Direction::Up),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Latency => "latency",
            TestKind::Download => "download",
            TestKind::Upload => "upload",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Throughput direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Short name used in result keys (`down` / `up`)
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
        }
    }

    /// Test kind that measures this direction
    pub fn kind(self) -> TestKind {
        match self {
            Direction::Down => TestKind::Download,
            Direction::Up => TestKind::Upload,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload sizes used by throughput tests, in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PayloadBucket {
    /// 100 000 bytes
    #[serde(rename = "100KB")]
    Kb100,
    /// 1 000 000 bytes
    #[serde(rename = "1MB")]
    Mb1,
    /// 10 000 000 bytes
    #[serde(rename = "10MB")]
    Mb10,
    /// 25 000 000 bytes
    #[serde(rename = "25MB")]
    Mb25,
}

impl PayloadBucket {
    /// All buckets, smallest first
    pub const ALL: [PayloadBucket; 4] = [
        PayloadBucket::Kb100,
        PayloadBucket::Mb1,
        PayloadBucket::Mb10,
        PayloadBucket::Mb25,
    ];

    /// Payload size in bytes
    pub fn size_bytes(self) -> u64 {
        match self {
            PayloadBucket::Kb100 => 100_000,
            PayloadBucket::Mb1 => 1_000_000,
            PayloadBucket::Mb10 => 10_000_000,
            PayloadBucket::Mb25 => 25_000_000,
        }
    }

    /// Stable label used in result keys
    pub fn label(self) -> &'static str {
        match self {
            PayloadBucket::Kb100 => "100KB",
            PayloadBucket::Mb1 => "1MB",
            PayloadBucket::Mb10 => "10MB",
            PayloadBucket::Mb25 => "25MB",
        }
    }
}

impl fmt::Display for PayloadBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PayloadBucket {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        PayloadBucket::ALL
            .iter()
            .copied()
            .find(|bucket| bucket.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AppError::parse(format!(
                    "Unknown payload bucket '{}' (expected one of 100KB, 1MB, 10MB, 25MB)",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_labels_round_trip() {
        for bucket in PayloadBucket::ALL {
            assert_eq!(bucket.label().parse::<PayloadBucket>().unwrap(), bucket);
        }
        assert_eq!("100kB".parse::<PayloadBucket>().unwrap(), PayloadBucket::Kb100);
        assert!("5MB".parse::<PayloadBucket>().is_err());
    }

    #[test]
    fn test_buckets_increase_in_size() {
        let sizes: Vec<u64> = PayloadBucket::ALL.iter().map(|b| b.size_bytes()).collect();
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
        assert!(PayloadBucket::Kb100 < PayloadBucket::Mb25);
    }

    #[test]
    fn test_kind_direction() {
        assert_eq!(TestKind::Latency.direction(), None);
        assert_eq!(TestKind::Download.direction(), Some(Direction::Down));
        assert_eq!(TestKind::Upload.direction(), Some(Direction::Up));
        assert_eq!(Direction::Up.kind(), TestKind::Upload);
    }
}
