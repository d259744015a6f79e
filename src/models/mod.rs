//! Data models and structures for the network speed tester

pub mod config;
pub mod metrics;
pub mod result;

// Re-export main model types
pub use config::{BucketPlan, Config};
pub use metrics::{CorrectedLatency, RawSample, TestSpec, ThroughputSample};
pub use result::{FailedSpec, RunReport, TestMetadata, TestResult};
