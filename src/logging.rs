//! Structured logging system for network speed tester
//!
//! This module provides:
//! - Structured logging with levels, fields and correlation IDs
//! - Console and JSON output formats
//! - A measurement logger for per-trial events (retries, dropped samples, failed tests)
//!
//! All log output goes to stderr so that stdout carries only the report.

use crate::error::{AppError, Result, TrialError};
use crate::models::{Config, FailedSpec, RawSample, TestSpec};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - per-trial detail
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - dropped samples, failed trials
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - errors that end the run
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Level name padded and colored for console output
    pub fn colorize(&self) -> ColoredString {
        let label = format!("{:>5}", self.as_str());
        match self {
            LogLevel::Trace => label.white(),
            LogLevel::Debug => label.cyan(),
            LogLevel::Info => label.green(),
            LogLevel::Warn => label.yellow(),
            LogLevel::Error => label.red(),
            LogLevel::Fatal => label.magenta(),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Shared logging context for session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Fatal, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        if let Some(session_id) = &self.context.read().await.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
        };

        let _ = writeln!(io::stderr(), "{}", output);
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");

        let formatted_level = if self.use_color {
            entry.level.colorize().to_string()
        } else {
            format!("{:>5}", entry.level.as_str())
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Tag the entry with the test it belongs to
    pub fn spec(self, spec: &TestSpec) -> Self {
        self.field("test_kind", spec.kind())
            .field("bucket", spec.bucket().map(|b| b.label()))
            .field("repetitions", spec.repetitions())
    }

    /// Add the timing of a raw sample
    pub fn sample(self, sample: &RawSample) -> Self {
        self.field("elapsed_seconds", sample.elapsed_seconds)
            .field("server_time_seconds", sample.server_time_seconds)
            .field("bytes_transferred", sample.bytes_transferred)
    }

    pub fn trial_error(self, error: &TrialError) -> Self {
        self.field("error_kind", error.kind())
            .field("error", error.to_string())
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for per-trial measurement events, correlated by run ID
pub struct MeasurementLogger {
    logger: Logger,
    run_id: String,
}

impl MeasurementLogger {
    pub fn new(config: &Config, run_id: &str) -> Self {
        Self {
            logger: Logger::with_config("MEAS".to_string(), config),
            run_id: run_id.to_string(),
        }
    }

    /// A logger that only reports warnings and above, for library use without configuration
    pub fn quiet(run_id: &str) -> Self {
        let mut logger = Logger::new("MEAS".to_string());
        logger.set_level(LogLevel::Warn);
        logger.set_color(false);
        Self { logger, run_id: run_id.to_string() }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn log_spec_start(&self, spec: &TestSpec) {
        self.logger.info(&format!("Running {}", spec))
            .correlation_id(&self.run_id)
            .spec(spec)
            .log()
            .await;
    }

    pub async fn log_trial(&self, spec: &TestSpec, trial: u32, sample: &RawSample) {
        self.logger.debug(&format!("{} trial {} completed", spec.kind(), trial + 1))
            .correlation_id(&self.run_id)
            .spec(spec)
            .field("trial", trial + 1)
            .sample(sample)
            .log()
            .await;
    }

    pub async fn log_retry(&self, spec: &TestSpec, trial: u32, attempt: u32, error: &TrialError) {
        self.logger.info(&format!("Retrying {} trial {} after: {}", spec.kind(), trial + 1, error))
            .correlation_id(&self.run_id)
            .spec(spec)
            .field("trial", trial + 1)
            .field("attempt", attempt)
            .trial_error(error)
            .log()
            .await;
    }

    pub async fn log_trial_failed(&self, spec: &TestSpec, trial: u32, attempts: u32, error: &TrialError) {
        self.logger.warn(&format!("{} trial {} failed after {} attempt(s): {}", spec.kind(), trial + 1, attempts, error))
            .correlation_id(&self.run_id)
            .spec(spec)
            .field("trial", trial + 1)
            .field("attempts", attempts)
            .trial_error(error)
            .log()
            .await;
    }

    /// A sample whose server time exceeded its elapsed time
    pub async fn log_dropped_sample(&self, spec: &TestSpec, trial: u32, corrected_seconds: f64) {
        self.logger.warn(&format!(
            "Dropping {} trial {}: corrected duration {:.6}s is not usable",
            spec.kind(), trial + 1, corrected_seconds
        ))
            .correlation_id(&self.run_id)
            .spec(spec)
            .field("trial", trial + 1)
            .field("corrected_seconds", corrected_seconds)
            .log()
            .await;
    }

    pub async fn log_spec_complete(&self, spec: &TestSpec, usable: usize, duration: Duration) {
        self.logger.info(&format!(
            "Completed {}: {} of {} trials usable in {:.3}s",
            spec, usable, spec.repetitions(), duration.as_secs_f64()
        ))
            .correlation_id(&self.run_id)
            .spec(spec)
            .field("usable", usable)
            .field("duration_seconds", duration.as_secs_f64())
            .log()
            .await;
    }

    pub async fn log_spec_failed(&self, failure: &FailedSpec) {
        self.logger.error(&format!("No usable samples for {}", failure.describe()))
            .correlation_id(&self.run_id)
            .field("test_kind", failure.kind)
            .field("bucket", failure.bucket.map(|b| b.label()))
            .field("attempted", failure.attempted)
            .field("last_error", failure.last_error)
            .log()
            .await;
    }

    pub async fn log_cancelled(&self, skipped_specs: usize) {
        self.logger.warn(&format!("Run cancelled, {} test(s) not started", skipped_specs))
            .correlation_id(&self.run_id)
            .field("skipped_specs", skipped_specs)
            .log()
            .await;
    }
}

/// Creates loggers that share one run/session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub fn create_measurement_logger(&self) -> MeasurementLogger {
        MeasurementLogger::new(&self.config, &self.session_id)
    }

    /// Session ID, used as the run ID of the report
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
