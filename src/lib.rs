//! Network Speed Tester
//!
//! Measures latency, jitter and upload/download throughput against a
//! Cloudflare-style speed test service, correcting every sample for the
//! server-reported processing time.

pub mod app;
pub mod assembler;
pub mod cli;
pub mod config;
pub mod client;
pub mod error;
pub mod logging;
pub mod stats;
pub mod executor;
pub mod output;
pub mod models;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result, TrialError, TrialErrorKind};
pub use models::{Config, FailedSpec, RawSample, RunReport, TestMetadata, TestResult, TestSpec};
pub use stats::{LatencyCalculator, LatencySummary, ThroughputAggregator};
pub use executor::{CancellationHandle, SpeedTestRunner, TestMatrixBuilder, TestSelection};
pub use client::{NetworkClient, SpeedTestClient};
pub use assembler::ResultAssembler;
pub use output::{OutputFormatter, OutputFormatterFactory};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Version line shown by `nst --version`
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_TIME"),
    ", ",
    env!("TARGET_TRIPLE"),
    ")"
);

/// Name, version, commit and target of this build
pub fn build_info() -> String {
    match option_env!("GIT_COMMIT") {
        Some(commit) => format!("{} {} ({})", PKG_NAME, LONG_VERSION, commit),
        None => format!("{} {}", PKG_NAME, LONG_VERSION),
    }
}

/// Default configuration values
pub mod defaults {
    use crate::types::PayloadBucket;
    use std::time::Duration;

    pub const DEFAULT_BASE_URL: &str = "https://speed.cloudflare.com";
    pub const DEFAULT_LATENCY_COUNT: u32 = 20;
    pub const DEFAULT_DOWNLOAD_TESTS: &[(PayloadBucket, u32)] = &[
        (PayloadBucket::Kb100, 10),
        (PayloadBucket::Mb1, 8),
        (PayloadBucket::Mb10, 6),
        (PayloadBucket::Mb25, 4),
    ];
    pub const DEFAULT_UPLOAD_TESTS: &[(PayloadBucket, u32)] = &[
        (PayloadBucket::Kb100, 8),
        (PayloadBucket::Mb1, 6),
        (PayloadBucket::Mb10, 4),
    ];
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);
    pub const DEFAULT_MAX_RETRIES: u32 = 2;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);
    pub const DEFAULT_PARALLELISM: usize = 1;
    pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(2);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const USER_AGENT: &str = concat!("network-speed-tester/", env!("CARGO_PKG_VERSION"));
}
