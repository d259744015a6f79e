//! Configuration data model and validation

use crate::types::{AppError, Direction, PayloadBucket, Result};
use crate::executor::matrix::TestSelection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Repetition count for one throughput bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPlan {
    pub bucket: PayloadBucket,
    pub repetitions: u32,
}

impl BucketPlan {
    pub fn new(bucket: PayloadBucket, repetitions: u32) -> Self {
        Self { bucket, repetitions }
    }
}

impl fmt::Display for BucketPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bucket, self.repetitions)
    }
}

impl FromStr for BucketPlan {
    type Err = AppError;

    /// Parses `LABEL:REPS`, e.g. `1MB:8`
    fn from_str(s: &str) -> Result<Self> {
        let (label, reps) = s.trim().split_once(':').ok_or_else(|| {
            AppError::parse(format!("Invalid test entry '{}': expected LABEL:REPETITIONS", s.trim()))
        })?;
        let bucket = label.parse::<PayloadBucket>()?;
        let repetitions = reps.trim().parse::<u32>().map_err(|e| {
            AppError::parse(format!("Invalid repetition count in '{}': {}", s.trim(), e))
        })?;
        Ok(Self { bucket, repetitions })
    }
}

/// Parse a comma-separated list of `LABEL:REPS` entries; an empty string yields no plans
pub fn parse_bucket_plans(value: &str) -> Result<Vec<BucketPlan>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(BucketPlan::from_str)
        .collect()
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base address of the speed test service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Number of latency probes
    #[serde(default = "default_latency_count")]
    pub latency_count: u32,

    /// Download buckets and their repetitions
    #[serde(default = "default_download_tests")]
    pub download_tests: Vec<BucketPlan>,

    /// Upload buckets and their repetitions
    #[serde(default = "default_upload_tests")]
    pub upload_tests: Vec<BucketPlan>,

    #[serde(default)]
    pub skip_latency: bool,

    #[serde(default)]
    pub skip_download: bool,

    #[serde(default)]
    pub skip_upload: bool,

    /// TCP/TLS connection timeout
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_seconds: u64,

    /// Deadline for a single trial, including the payload transfer
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Extra attempts per failed trial
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Concurrent trials within one bucket
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// How long in-flight trials may finish after cancellation
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Emit the report as JSON
    #[serde(default)]
    pub json: bool,

    /// Display throughput in bits per second instead of megabits
    #[serde(default)]
    pub bits_per_second: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            latency_count: default_latency_count(),
            download_tests: default_download_tests(),
            upload_tests: default_upload_tests(),
            skip_latency: false,
            skip_download: false,
            skip_upload: false,
            connect_timeout_seconds: default_connect_timeout_secs(),
            timeout_seconds: default_timeout_secs(),
            max_retries: default_max_retries(),
            parallelism: default_parallelism(),
            cancel_grace_ms: default_cancel_grace_ms(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            json: false,
            bits_per_second: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-trial deadline as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    /// Test plans for one direction, empty when that direction is skipped
    pub fn plans_for(&self, direction: Direction) -> &[BucketPlan] {
        match direction {
            Direction::Down if !self.skip_download => &self.download_tests,
            Direction::Up if !self.skip_upload => &self.upload_tests,
            _ => &[],
        }
    }

    /// The test selection this configuration requests
    pub fn test_selection(&self) -> TestSelection {
        TestSelection {
            latency_repetitions: if self.skip_latency { None } else { Some(self.latency_count) },
            download: self.plans_for(Direction::Down).to_vec(),
            upload: self.plans_for(Direction::Up).to_vec(),
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(AppError::config("Base URL cannot be empty"));
        }

        match url::Url::parse(&self.base_url) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("Base URL must use http or https: {}", self.base_url)));
                }
                if parsed.host_str().is_none() {
                    return Err(AppError::config(format!("Base URL must have a host: {}", self.base_url)));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid base URL '{}': {}", self.base_url, e)));
            }
        }

        if !self.skip_latency && self.latency_count == 0 {
            return Err(AppError::config("Latency count must be greater than 0"));
        }

        for direction in [Direction::Down, Direction::Up] {
            let mut seen = HashSet::new();
            for plan in self.plans_for(direction) {
                if plan.repetitions == 0 {
                    return Err(AppError::config(format!(
                        "Repetitions for {} {} must be greater than 0", direction.kind(), plan.bucket
                    )));
                }
                if !seen.insert(plan.bucket) {
                    return Err(AppError::config(format!(
                        "Bucket {} listed more than once for {}", plan.bucket, direction.kind()
                    )));
                }
            }
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > 600 {
            return Err(AppError::config("Timeout cannot exceed 600 seconds"));
        }

        if self.connect_timeout_seconds == 0 {
            return Err(AppError::config("Connect timeout must be greater than 0"));
        }

        if self.max_retries > 10 {
            return Err(AppError::config("Retries cannot exceed 10"));
        }

        if self.parallelism == 0 {
            return Err(AppError::config("Parallelism must be greater than 0"));
        }

        if self.parallelism > 16 {
            return Err(AppError::config("Parallelism cannot exceed 16"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("SPEEDTEST_BASE_URL") {
            self.base_url = base_url.trim().to_string();
        }

        if let Ok(count) = std::env::var("SPEEDTEST_LATENCY_COUNT") {
            self.latency_count = count.parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_LATENCY_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(tests) = std::env::var("SPEEDTEST_DOWNLOAD_TESTS") {
            self.download_tests = parse_bucket_plans(&tests)
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_DOWNLOAD_TESTS value '{}': {}", tests, e)))?;
        }

        if let Ok(tests) = std::env::var("SPEEDTEST_UPLOAD_TESTS") {
            self.upload_tests = parse_bucket_plans(&tests)
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_UPLOAD_TESTS value '{}': {}", tests, e)))?;
        }

        if let Ok(timeout) = std::env::var("SPEEDTEST_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(timeout) = std::env::var("SPEEDTEST_CONNECT_TIMEOUT_SECONDS") {
            self.connect_timeout_seconds = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_CONNECT_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(retries) = std::env::var("SPEEDTEST_MAX_RETRIES") {
            self.max_retries = retries.parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_MAX_RETRIES value '{}': {}", retries, e)))?;
        }

        if let Ok(parallelism) = std::env::var("SPEEDTEST_PARALLELISM") {
            self.parallelism = parallelism.parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_PARALLELISM value '{}': {}", parallelism, e)))?;
        }

        if let Ok(enable_color) = std::env::var("SPEEDTEST_ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    crate::defaults::DEFAULT_BASE_URL.to_string()
}

fn default_latency_count() -> u32 {
    crate::defaults::DEFAULT_LATENCY_COUNT
}

fn default_download_tests() -> Vec<BucketPlan> {
    crate::defaults::DEFAULT_DOWNLOAD_TESTS
        .iter()
        .map(|&(bucket, reps)| BucketPlan::new(bucket, reps))
        .collect()
}

fn default_upload_tests() -> Vec<BucketPlan> {
    crate::defaults::DEFAULT_UPLOAD_TESTS
        .iter()
        .map(|&(bucket, reps)| BucketPlan::new(bucket, reps))
        .collect()
}

fn default_connect_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_max_retries() -> u32 {
    crate::defaults::DEFAULT_MAX_RETRIES
}

fn default_parallelism() -> usize {
    crate::defaults::DEFAULT_PARALLELISM
}

fn default_cancel_grace_ms() -> u64 {
    crate::defaults::DEFAULT_CANCEL_GRACE.as_millis() as u64
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.latency_count, 20);
        assert_eq!(config.download_tests.len(), 4);
        assert_eq!(config.upload_tests.len(), 3);
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.base_url = "ftp://speed.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_latency_count_invalid_unless_skipped() {
        let mut config = Config::default();
        config.latency_count = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.skip_latency = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_bucket_repetitions_invalid() {
        let mut config = Config::default();
        config.upload_tests = vec![BucketPlan::new(PayloadBucket::Mb1, 0)];
        assert!(config.validate().is_err());

        config.skip_upload = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_bucket_invalid() {
        let mut config = Config::default();
        config.download_tests = vec![
            BucketPlan::new(PayloadBucket::Kb100, 3),
            BucketPlan::new(PayloadBucket::Kb100, 2),
        ];
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("more than once"));
    }

    #[test]
    fn test_zero_parallelism_invalid() {
        let mut config = Config::default();
        config.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bucket_plans() {
        let plans = parse_bucket_plans("100KB:10, 1mb:8,").unwrap();
        assert_eq!(plans, vec![
            BucketPlan::new(PayloadBucket::Kb100, 10),
            BucketPlan::new(PayloadBucket::Mb1, 8),
        ]);
        assert!(parse_bucket_plans("").unwrap().is_empty());
        assert!(parse_bucket_plans("100KB").is_err());
        assert!(parse_bucket_plans("100KB:x").is_err());
        assert!(parse_bucket_plans("3MB:2").is_err());
    }

    #[test]
    fn test_bucket_plan_display() {
        assert_eq!(BucketPlan::new(PayloadBucket::Mb25, 4).to_string(), "25MB:4");
    }

    #[test]
    fn test_selection_respects_skips() {
        let mut config = Config::default();
        config.skip_latency = true;
        config.skip_upload = true;

        let selection = config.test_selection();
        assert_eq!(selection.latency_repetitions, None);
        assert_eq!(selection.download.len(), 4);
        assert!(selection.upload.is_empty());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: Config = serde_json::from_str("{\"latency_count\": 5}").unwrap();
        assert_eq!(config.latency_count, 5);
        assert_eq!(config.base_url, crate::defaults::DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, crate::defaults::DEFAULT_MAX_RETRIES);
    }
}
