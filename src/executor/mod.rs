//! Test execution engine
//!
//! This module contains:
//! - The test matrix builder that orders the run's test specifications
//! - The runner that executes trials with retries and bounded parallelism
//! - The cancellation signal that stops a run early

pub mod cancel;
pub mod matrix;

pub use cancel::{CancellationHandle, CancellationSignal};
pub use matrix::{TestMatrixBuilder, TestSelection};

use crate::{
    client::SpeedTestClient,
    error::{TrialError, TrialErrorKind},
    logging::MeasurementLogger,
    models::{Config, FailedSpec, RawSample, TestSpec},
    stats::{LatencyCalculator, ThroughputAggregator},
};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execution parameters of the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Extra attempts for a failed trial
    pub max_retries: u32,
    /// Pause between attempts of the same trial
    pub retry_delay: Duration,
    /// Trials of one spec in flight at once
    pub parallelism: usize,
    /// Time in-flight trials get to finish after cancellation
    pub cancel_grace: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::defaults::DEFAULT_MAX_RETRIES,
            retry_delay: crate::defaults::DEFAULT_RETRY_DELAY,
            parallelism: crate::defaults::DEFAULT_PARALLELISM,
            cancel_grace: crate::defaults::DEFAULT_CANCEL_GRACE,
        }
    }
}

impl From<&Config> for ExecutionConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: crate::defaults::DEFAULT_RETRY_DELAY,
            parallelism: config.parallelism.max(1),
            cancel_grace: config.cancel_grace(),
        }
    }
}

/// Everything the runner collected, ready for assembly
#[derive(Debug, Default)]
pub struct Measurements {
    pub latency: LatencyCalculator,
    pub throughput: ThroughputAggregator,
    /// Specs that produced no usable trial, in run order
    pub failures: Vec<FailedSpec>,
    pub requested_specs: usize,
    pub cancelled: bool,
}

/// Executes test specs one after another and folds their samples
pub struct SpeedTestRunner {
    client: Arc<dyn SpeedTestClient>,
    config: ExecutionConfig,
    logger: MeasurementLogger,
    cancel: CancellationSignal,
}

impl SpeedTestRunner {
    pub fn new(client: Arc<dyn SpeedTestClient>, config: ExecutionConfig, logger: MeasurementLogger) -> Self {
        Self {
            client,
            config,
            logger,
            cancel: CancellationSignal::never(),
        }
    }

    /// Stop starting trials once `signal` fires
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancel = signal;
        self
    }

    pub fn run_id(&self) -> &str {
        self.logger.run_id()
    }

    /// Run every spec in order. Never fails: trial errors end up in the
    /// failure list of the returned measurements.
    pub async fn run(&self, specs: &[TestSpec]) -> Measurements {
        let mut measurements = Measurements {
            requested_specs: specs.len(),
            ..Default::default()
        };

        for (index, spec) in specs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let remaining = &specs[index..];
                self.logger.log_cancelled(remaining.len()).await;
                measurements.failures.extend(remaining.iter().map(|spec| FailedSpec {
                    kind: spec.kind(),
                    bucket: spec.bucket(),
                    attempted: spec.repetitions(),
                    last_error: Some(TrialErrorKind::Cancelled),
                }));
                break;
            }
            self.run_spec(spec, &mut measurements).await;
        }

        measurements.cancelled = self.cancel.is_cancelled();
        measurements
    }

    async fn run_spec(&self, spec: &TestSpec, measurements: &mut Measurements) {
        let started = Instant::now();
        self.logger.log_spec_start(spec).await;

        let mut usable = 0usize;
        let mut last_error = None;

        let mut trials = stream::iter(0..spec.repetitions())
            .map(|trial| self.run_trial(spec, trial))
            .buffered(self.config.parallelism.max(1));

        // Results arrive in trial order regardless of completion order.
        while let Some((trial, outcome)) = trials.next().await {
            let sample = match outcome {
                Ok(sample) => sample,
                Err(error) => {
                    last_error = Some(error.kind());
                    continue;
                }
            };
            self.logger.log_trial(spec, trial, &sample).await;

            let folded = match (spec.direction(), spec.bucket()) {
                (Some(direction), Some(bucket)) => measurements
                    .throughput
                    .record(direction, bucket, sample)
                    .map(|_| ()),
                _ => measurements.latency.record(sample).map(|_| ()),
            };

            match folded {
                Ok(()) => usable += 1,
                Err(corrected_seconds) => {
                    last_error = Some(TrialErrorKind::InvalidTiming);
                    self.logger.log_dropped_sample(spec, trial, corrected_seconds).await;
                }
            }
        }

        if usable == 0 {
            let failure = FailedSpec {
                kind: spec.kind(),
                bucket: spec.bucket(),
                attempted: spec.repetitions(),
                last_error,
            };
            self.logger.log_spec_failed(&failure).await;
            measurements.failures.push(failure);
        } else {
            self.logger.log_spec_complete(spec, usable, started.elapsed()).await;
        }
    }

    /// One trial including its retries
    async fn run_trial(&self, spec: &TestSpec, trial: u32) -> (u32, Result<RawSample, TrialError>) {
        let max_attempts = 1 + self.config.max_retries;
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                return (trial, Err(TrialError::Cancelled));
            }
            attempt += 1;

            match self.guarded_attempt(spec).await {
                Ok(sample) => return (trial, Ok(sample)),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    self.logger.log_retry(spec, trial, attempt, &error).await;
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
                Err(error) => {
                    self.logger.log_trial_failed(spec, trial, attempt, &error).await;
                    return (trial, Err(error));
                }
            }
        }
    }

    /// A single attempt that is abandoned once cancellation plus the grace
    /// period has elapsed
    async fn guarded_attempt(&self, spec: &TestSpec) -> Result<RawSample, TrialError> {
        let grace = self.config.cancel_grace;
        tokio::select! {
            result = self.client.run_trial(spec) => result,
            _ = async {
                self.cancel.cancelled().await;
                tokio::time::sleep(grace).await;
            } => Err(TrialError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::TestMetadata;
    use crate::types::{Direction, PayloadBucket, TestKind};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Step {
        Sample { elapsed_ms: u64, server_ms: u64, bytes: u64 },
        Fail(TrialError),
        Hang,
    }

    /// Replays scripted outcomes in call order; once exhausted every call
    /// succeeds with a 10ms sample of the requested size
    struct ScriptedClient {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedClient {
        fn new(steps: Vec<Step>) -> Self {
            Self { steps: Mutex::new(steps.into()), calls: AtomicUsize::new(0), delay: Duration::ZERO }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeedTestClient for ScriptedClient {
        async fn run_trial(&self, spec: &TestSpec) -> std::result::Result<RawSample, TrialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match step {
                Some(Step::Sample { elapsed_ms, server_ms, bytes }) => Ok(RawSample::new(
                    Duration::from_millis(elapsed_ms),
                    Duration::from_millis(server_ms),
                    bytes,
                )),
                Some(Step::Fail(error)) => Err(error),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(TrialError::Timeout(Duration::from_secs(60)))
                }
                None => Ok(RawSample::new(Duration::from_millis(10), Duration::ZERO, spec.wire_bytes())),
            }
        }

        async fn fetch_metadata(&self) -> Result<TestMetadata> {
            Ok(TestMetadata::default())
        }
    }

    fn config(max_retries: u32, parallelism: usize) -> ExecutionConfig {
        ExecutionConfig {
            max_retries,
            retry_delay: Duration::from_millis(1),
            parallelism,
            cancel_grace: Duration::from_millis(50),
        }
    }

    fn runner(client: Arc<ScriptedClient>, config: ExecutionConfig) -> SpeedTestRunner {
        SpeedTestRunner::new(client, config, MeasurementLogger::quiet("test-run"))
    }

    fn sample(elapsed_ms: u64, bytes: u64) -> Step {
        Step::Sample { elapsed_ms, server_ms: 0, bytes }
    }

    fn connection_failure() -> Step {
        Step::Fail(TrialError::ConnectionFailure("refused".to_string()))
    }

    #[test]
    fn test_execution_config_from_config() {
        let config = Config { max_retries: 4, parallelism: 3, cancel_grace_ms: 500, ..Default::default() };
        let execution = ExecutionConfig::from(&config);
        assert_eq!(execution.max_retries, 4);
        assert_eq!(execution.parallelism, 3);
        assert_eq!(execution.cancel_grace, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_three_of_five_trials_average_the_three() {
        let client = Arc::new(ScriptedClient::new(vec![
            sample(100, 100_000),
            connection_failure(),
            sample(200, 100_000),
            Step::Fail(TrialError::Timeout(Duration::from_secs(25))),
            sample(400, 100_000),
        ]));
        let spec = TestSpec::throughput(Direction::Down, PayloadBucket::Kb100, 5);
        let measurements = runner(client.clone(), config(0, 1)).run(&[spec]).await;

        let expected = (8e6 + 4e6 + 2e6) / 3.0;
        let mean = measurements.throughput.bucket_mean(Direction::Down, PayloadBucket::Kb100).unwrap();
        assert!((mean - expected).abs() < 1e-3);
        assert_eq!(measurements.throughput.sample_count(Direction::Down, PayloadBucket::Kb100), 3);
        assert!(measurements.failures.is_empty());
        assert_eq!(client.calls(), 5);
    }

    #[tokio::test]
    async fn test_all_failed_bucket_listed_with_last_error() {
        let client = Arc::new(ScriptedClient::new(vec![
            connection_failure(),
            Step::Fail(TrialError::ShortTransfer { expected: 1_000_000, received: 10 }),
            sample(10, 100_000),
        ]));
        let specs = [
            TestSpec::throughput(Direction::Up, PayloadBucket::Mb1, 2),
            TestSpec::throughput(Direction::Up, PayloadBucket::Kb100, 1),
        ];
        let measurements = runner(client, config(0, 1)).run(&specs).await;

        assert_eq!(measurements.failures, vec![FailedSpec {
            kind: TestKind::Upload,
            bucket: Some(PayloadBucket::Mb1),
            attempted: 2,
            last_error: Some(TrialErrorKind::ShortTransfer),
        }]);
        assert_eq!(measurements.throughput.bucket_mean(Direction::Up, PayloadBucket::Mb1), None);
        assert!(measurements.throughput.bucket_mean(Direction::Up, PayloadBucket::Kb100).is_some());
        assert!(!measurements.cancelled);
    }

    #[tokio::test]
    async fn test_failed_attempts_are_retried() {
        let client = Arc::new(ScriptedClient::new(vec![
            connection_failure(),
            Step::Fail(TrialError::MalformedResponse("status 502".to_string())),
            sample(20, 1),
        ]));
        let measurements = runner(client.clone(), config(2, 1)).run(&[TestSpec::latency(1)]).await;

        assert_eq!(client.calls(), 3);
        assert_eq!(measurements.latency.len(), 1);
        assert!(measurements.failures.is_empty());
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let client = Arc::new(ScriptedClient::new(vec![
            connection_failure(),
            connection_failure(),
            connection_failure(),
            sample(20, 1),
        ]));
        let measurements = runner(client.clone(), config(2, 1)).run(&[TestSpec::latency(1)]).await;

        assert_eq!(client.calls(), 3);
        assert!(measurements.latency.is_empty());
        assert_eq!(measurements.failures.len(), 1);
        assert_eq!(measurements.failures[0].last_error, Some(TrialErrorKind::ConnectionFailure));
    }

    #[tokio::test]
    async fn test_negative_latency_dropped() {
        let client = Arc::new(ScriptedClient::new(vec![
            sample(10, 1),
            Step::Sample { elapsed_ms: 5, server_ms: 9, bytes: 1 },
            sample(14, 1),
        ]));
        let measurements = runner(client, config(0, 1)).run(&[TestSpec::latency(3)]).await;

        assert_eq!(measurements.latency.len(), 2);
        assert_eq!(measurements.latency.dropped(), 1);
        let summary = measurements.latency.summary().unwrap();
        assert!((summary.latency_seconds - 0.012).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_only_invalid_timing_fails_spec() {
        let client = Arc::new(ScriptedClient::new(vec![
            Step::Sample { elapsed_ms: 5, server_ms: 9, bytes: 100_000 },
        ]));
        let spec = TestSpec::throughput(Direction::Down, PayloadBucket::Kb100, 1);
        let measurements = runner(client, config(0, 1)).run(&[spec]).await;

        assert_eq!(measurements.failures.len(), 1);
        assert_eq!(measurements.failures[0].last_error, Some(TrialErrorKind::InvalidTiming));
    }

    #[tokio::test]
    async fn test_parallel_trials_overlap() {
        let client = Arc::new(ScriptedClient::new(Vec::new()).with_delay(Duration::from_millis(200)));
        let spec = TestSpec::throughput(Direction::Down, PayloadBucket::Kb100, 4);

        let started = Instant::now();
        let measurements = runner(client.clone(), config(0, 4)).run(&[spec]).await;

        assert!(started.elapsed() < Duration::from_millis(700));
        assert_eq!(measurements.throughput.sample_count(Direction::Down, PayloadBucket::Kb100), 4);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let (handle, signal) = CancellationHandle::new();
        handle.cancel();

        let specs = [TestSpec::latency(3), TestSpec::throughput(Direction::Down, PayloadBucket::Mb1, 2)];
        let measurements = runner(client.clone(), config(2, 1))
            .with_cancellation(signal)
            .run(&specs)
            .await;

        assert_eq!(client.calls(), 0);
        assert!(measurements.cancelled);
        assert_eq!(measurements.failures.len(), 2);
        assert!(measurements
            .failures
            .iter()
            .all(|f| f.last_error == Some(TrialErrorKind::Cancelled)));
    }

    #[tokio::test]
    async fn test_in_flight_trial_abandoned_after_grace() {
        let client = Arc::new(ScriptedClient::new(vec![sample(10, 1), Step::Hang]));
        let (handle, signal) = CancellationHandle::new();
        let runner = runner(client.clone(), config(2, 1)).with_cancellation(signal);

        let specs = [TestSpec::latency(5), TestSpec::throughput(Direction::Up, PayloadBucket::Kb100, 2)];
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        };

        let started = Instant::now();
        let (measurements, _) = tokio::join!(runner.run(&specs), cancel);

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(measurements.cancelled);
        assert_eq!(client.calls(), 2);
        assert_eq!(measurements.latency.len(), 1);
        assert_eq!(measurements.failures.len(), 1);
        assert_eq!(measurements.failures[0].kind, TestKind::Upload);
    }
}
