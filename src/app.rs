//! Main application orchestration and execution

use crate::{
    assembler::ResultAssembler,
    client::{NetworkClient, SpeedTestClient},
    config::{display_config_summary, validate_config},
    error::{AppError, Result},
    executor::{CancellationSignal, ExecutionConfig, SpeedTestRunner, TestMatrixBuilder},
    logging::LoggerFactory,
    models::{Config, RunReport, TestMetadata},
};
use chrono::Utc;
use std::sync::Arc;

/// Coordinates one speed test run from configuration to report
pub struct App {
    config: Config,
    client: Option<Arc<dyn SpeedTestClient>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config, client: None }
    }

    /// Use a specific client instead of one built from the configuration
    pub fn with_client(mut self, client: Arc<dyn SpeedTestClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the configured tests. Trial failures never abort the run; they
    /// are listed in the report.
    pub async fn run(&self, cancel: CancellationSignal) -> Result<RunReport> {
        let config = &self.config;

        for warning in validate_config(config)? {
            eprintln!("{}", warning.format(config.enable_color));
        }

        let specs = TestMatrixBuilder::build(&config.test_selection())?;

        let factory = LoggerFactory::new(config.clone());
        let logger = factory.create_logger("app").await;

        if config.debug {
            logger.debug("Configuration loaded")
                .field("summary", display_config_summary(config))
                .log()
                .await;
        }

        let client: Arc<dyn SpeedTestClient> = match &self.client {
            Some(client) => Arc::clone(client),
            None => Arc::new(NetworkClient::from_config(config)?),
        };

        let started_at = Utc::now();

        let metadata = tokio::select! {
            result = client.fetch_metadata() => result,
            _ = cancel.cancelled() => Err(AppError::cancelled("metadata lookup interrupted")),
        };
        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(error) => {
                logger.warn("Metadata lookup failed, continuing without it")
                    .error_info(&error)
                    .log()
                    .await;
                TestMetadata::default()
            }
        };

        logger.info("Starting speed test")
            .field("base_url", &config.base_url)
            .field("specs", specs.len())
            .log()
            .await;

        let runner = SpeedTestRunner::new(
            client,
            ExecutionConfig::from(config),
            factory.create_measurement_logger(),
        )
        .with_cancellation(cancel);

        let measurements = runner.run(&specs).await;
        let report = ResultAssembler::report(runner.run_id(), started_at, metadata, measurements);

        logger.info("Speed test finished")
            .field("failed_specs", report.failures.len())
            .field("requested_specs", report.requested_specs)
            .field("cancelled", report.cancelled)
            .log()
            .await;

        Ok(report)
    }
}

/// Map a finished report onto the process outcome: an error when nothing
/// usable was measured, otherwise success.
pub fn report_outcome(report: &RunReport) -> Result<()> {
    if !report.all_failed() {
        return Ok(());
    }
    if report.cancelled {
        return Err(AppError::test_execution("run cancelled before any test produced data"));
    }
    let failed: Vec<String> = report.failures.iter().map(|failure| failure.describe()).collect();
    Err(AppError::insufficient_samples(format!(
        "no requested test produced a usable sample ({})",
        failed.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrialError;
    use crate::executor::CancellationHandle;
    use crate::models::{RawSample, TestSpec};
    use crate::types::TestKind;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers every trial with fixed timings; uploads always time out
    struct FixedClient {
        metadata_fails: bool,
    }

    #[async_trait]
    impl SpeedTestClient for FixedClient {
        async fn run_trial(&self, spec: &TestSpec) -> std::result::Result<RawSample, TrialError> {
            match spec.kind() {
                TestKind::Upload => Err(TrialError::Timeout(Duration::from_millis(10))),
                _ => Ok(RawSample::new(
                    Duration::from_millis(20),
                    Duration::from_millis(5),
                    spec.payload_size_bytes(),
                )),
            }
        }

        async fn fetch_metadata(&self) -> Result<TestMetadata> {
            if self.metadata_fails {
                Err(AppError::network("meta unavailable"))
            } else {
                Ok(TestMetadata { location_code: Some("FRA".to_string()), ..Default::default() })
            }
        }
    }

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.latency_count = 3;
        config.download_tests = crate::models::config::parse_bucket_plans("100KB:2").unwrap();
        config.upload_tests = crate::models::config::parse_bucket_plans("100KB:2").unwrap();
        config.max_retries = 0;
        config.enable_color = false;
        config
    }

    #[tokio::test]
    async fn test_partial_run_reports_failures() {
        let app = App::new(quick_config()).with_client(Arc::new(FixedClient { metadata_fails: false }));
        let report = app.run(CancellationSignal::never()).await.unwrap();

        assert_eq!(report.requested_specs, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, TestKind::Upload);
        assert!(report.is_partial());
        assert!((report.result.latency_seconds.unwrap() - 0.015).abs() < 1e-9);
        assert_eq!(report.result.jitter_seconds, Some(0.0));
        assert!(report.result.down_100kb_bps.is_some());
        assert!(report.result.up_100kb_bps.is_none());
        assert_eq!(report.result.location_code.as_deref(), Some("FRA"));
        assert!(report_outcome(&report).is_ok());
    }

    /// Replays fixed elapsed times per test kind, in call order, with no
    /// server processing time
    struct ScriptedClient {
        elapsed_ms: std::sync::Mutex<std::collections::HashMap<TestKind, std::collections::VecDeque<u64>>>,
    }

    impl ScriptedClient {
        fn new(latency: &[u64], download: &[u64], upload: &[u64]) -> Self {
            let mut script = std::collections::HashMap::new();
            script.insert(TestKind::Latency, latency.iter().copied().collect());
            script.insert(TestKind::Download, download.iter().copied().collect());
            script.insert(TestKind::Upload, upload.iter().copied().collect());
            Self { elapsed_ms: std::sync::Mutex::new(script) }
        }
    }

    #[async_trait]
    impl SpeedTestClient for ScriptedClient {
        async fn run_trial(&self, spec: &TestSpec) -> std::result::Result<RawSample, TrialError> {
            let elapsed = self
                .elapsed_ms
                .lock()
                .unwrap()
                .get_mut(&spec.kind())
                .and_then(|queue| queue.pop_front())
                .expect("more trials than scripted");
            Ok(RawSample::new(Duration::from_millis(elapsed), Duration::ZERO, spec.wire_bytes()))
        }

        async fn fetch_metadata(&self) -> Result<TestMetadata> {
            Ok(TestMetadata::default())
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value present");
        assert!(
            (actual - expected).abs() <= expected.abs() * 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[tokio::test]
    async fn test_latency_and_100kb_scenario_values() {
        let mut config = quick_config();
        config.latency_count = 5;
        config.download_tests = crate::models::config::parse_bucket_plans("100KB:3").unwrap();
        config.upload_tests = crate::models::config::parse_bucket_plans("100KB:3").unwrap();

        let client = ScriptedClient::new(&[10, 14, 11, 13, 12], &[80, 100, 160], &[40, 50, 100]);
        let report = App::new(config)
            .with_client(Arc::new(client))
            .run(CancellationSignal::never())
            .await
            .unwrap();

        assert!(report.is_complete(), "{:?}", report.failures);
        let result = &report.result;

        assert_close(result.latency_seconds, 0.012);
        assert_close(result.jitter_seconds, 0.0025);

        // 100KB = 800_000 bits: 10, 8 and 5 Mbps down; 20, 16 and 8 Mbps up
        assert_close(result.down_100kb_bps, (10e6 + 8e6 + 5e6) / 3.0);
        assert_close(result.up_100kb_bps, (20e6 + 16e6 + 8e6) / 3.0);
        assert_close(result.percentile_90_down_bps, 8e6 + (10e6 - 8e6) * 0.8);
        assert_close(result.percentile_90_up_bps, 16e6 + (20e6 - 16e6) * 0.8);

        assert!(result.down_1mb_bps.is_none());
        assert!(result.up_1mb_bps.is_none());
    }

    #[tokio::test]
    async fn test_metadata_failure_is_not_fatal() {
        let app = App::new(quick_config()).with_client(Arc::new(FixedClient { metadata_fails: true }));
        let report = app.run(CancellationSignal::never()).await.unwrap();
        assert_eq!(report.result.location_code, None);
        assert!(report.result.latency_seconds.is_some());
    }

    #[tokio::test]
    async fn test_all_failed_outcome() {
        let mut config = quick_config();
        config.skip_latency = true;
        config.skip_download = true;
        let app = App::new(config).with_client(Arc::new(FixedClient { metadata_fails: false }));
        let report = app.run(CancellationSignal::never()).await.unwrap();

        assert!(report.all_failed());
        let error = report_outcome(&report).unwrap_err();
        assert!(matches!(error, AppError::InsufficientSamples(_)), "got {:?}", error);
        assert!(error.to_string().contains("upload 100KB"), "{}", error);
        assert_eq!(error.exit_code(), 6);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (handle, signal) = CancellationHandle::new();
        handle.cancel();

        let app = App::new(quick_config()).with_client(Arc::new(FixedClient { metadata_fails: false }));
        let report = app.run(signal).await.unwrap();

        assert!(report.cancelled);
        assert!(report.all_failed());
        assert!(matches!(report_outcome(&report), Err(AppError::TestExecution(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_network() {
        let mut config = quick_config();
        config.parallelism = 0;
        let app = App::new(config).with_client(Arc::new(FixedClient { metadata_fails: false }));
        let result = app.run(CancellationSignal::never()).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_empty_run_is_success() {
        let report = RunReport {
            run_id: "r".to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            result: crate::models::TestResult::from_metadata(TestMetadata::default()),
            failures: Vec::new(),
            requested_specs: 0,
            cancelled: false,
        };
        assert!(report_outcome(&report).is_ok());
    }
}
