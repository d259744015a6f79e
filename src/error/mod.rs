//! Error handling for the network speed tester

use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom error types for the network speed tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors, rejected before any network activity
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Test execution errors
    #[error("Test execution error: {0}")]
    TestExecution(String),

    /// A requested test produced no usable samples
    #[error("Insufficient samples: {0}")]
    InsufficientSamples(String),

    /// The run was cancelled externally
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new test execution error
    pub fn test_execution<S: Into<String>>(message: S) -> Self {
        Self::TestExecution(message.into())
    }

    /// Create a new insufficient samples error
    pub fn insufficient_samples<S: Into<String>>(message: S) -> Self {
        Self::InsufficientSamples(message.into())
    }

    /// Create a new cancellation error
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::TestExecution(_) => "TEST",
            Self::InsufficientSamples(_) => "SAMPLES",
            Self::Cancelled(_) => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Io(_) | Self::TestExecution(_) => false,
            Self::InsufficientSamples(_) | Self::Cancelled(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file, SPEEDTEST_* variables or command line arguments.", msg)
            }
            Self::Network(msg) => {
                format!("Network connectivity issue: {}\n\nSuggestion: Check your internet connection and try again.", msg)
            }
            Self::HttpRequest(msg) => {
                format!("HTTP request failed: {}\n\nSuggestion: The speed test service may be unavailable. Try again later or use --base-url.", msg)
            }
            Self::Timeout(msg) => {
                format!("Request timed out: {}\n\nSuggestion: Increase the timeout value using --timeout or test fewer/smaller payloads.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the format of your URLs and test lists (e.g. 100KB:10,1MB:8).", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration files.", msg)
            }
            Self::TestExecution(msg) => {
                format!("Test execution failed: {}\n\nSuggestion: This may be a temporary issue. Try running the test again.", msg)
            }
            Self::InsufficientSamples(msg) => {
                format!("Not enough successful measurements: {}\n\nSuggestion: Increase --retries or the repetition counts.", msg)
            }
            Self::Cancelled(msg) => {
                format!("Run cancelled: {}", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::HttpRequest(_) => 2,  // Network issues
            Self::Timeout(_) => 3,  // Timeout issues
            Self::Io(_) => 5,  // I/O issues
            Self::TestExecution(_) | Self::InsufficientSamples(_) => 6,  // Test execution issues
            Self::Cancelled(_) => 130,  // Interrupted
            Self::Internal(_) => 99,  // Internal/unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::HttpRequest(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) | Self::Cancelled(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::TestExecution(_) | Self::InsufficientSamples(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

/// Failure of a single timed probe
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrialError {
    /// No complete response within the trial deadline
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Network, DNS or TLS failure before any payload was exchanged
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Response received but unusable (bad status, unparsable timing header)
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Fewer bytes moved than requested
    #[error("short transfer: expected {expected} bytes, got {received}")]
    ShortTransfer { expected: u64, received: u64 },

    /// Abandoned because the run was cancelled
    #[error("trial cancelled")]
    Cancelled,
}

impl TrialError {
    /// Serializable classification of this failure
    pub fn kind(&self) -> TrialErrorKind {
        match self {
            Self::Timeout(_) => TrialErrorKind::Timeout,
            Self::ConnectionFailure(_) => TrialErrorKind::ConnectionFailure,
            Self::MalformedResponse(_) => TrialErrorKind::MalformedResponse,
            Self::ShortTransfer { .. } => TrialErrorKind::ShortTransfer,
            Self::Cancelled => TrialErrorKind::Cancelled,
        }
    }

    /// Whether another attempt of the same trial makes sense
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Classify a transport error raised while sending the request or
    /// reading the response. A connect timeout is a connection failure.
    pub fn from_transport(error: &reqwest::Error, deadline: Duration) -> Self {
        if error.is_connect() {
            Self::ConnectionFailure(error.to_string())
        } else if error.is_timeout() {
            Self::Timeout(deadline)
        } else if error.is_request() {
            Self::ConnectionFailure(error.to_string())
        } else {
            Self::MalformedResponse(error.to_string())
        }
    }
}

/// Classification of trial failures used in run summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialErrorKind {
    Timeout,
    ConnectionFailure,
    MalformedResponse,
    ShortTransfer,
    Cancelled,
    /// Response arrived but its timing was unusable (server time >= elapsed)
    InvalidTiming,
}

impl TrialErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection_failure",
            Self::MalformedResponse => "malformed_response",
            Self::ShortTransfer => "short_transfer",
            Self::Cancelled => "cancelled",
            Self::InvalidTiming => "invalid_timing",
        }
    }
}

impl std::fmt::Display for TrialErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user feedback on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());

            if error.is_recoverable() {
                eprintln!();
                if self.use_color {
                    use colored::Colorize;
                    eprintln!("{}", "This error might be temporary. You can try running the command again.".green());
                } else {
                    eprintln!("This error might be temporary. You can try running the command again.");
                }
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Zero repetitions for latency");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let network_error = AppError::network("Connection failed");
        assert_eq!(network_error.category(), "NETWORK");
        assert!(network_error.is_recoverable());
        assert_eq!(network_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::insufficient_samples("download 10MB: 0 of 6 trials succeeded");
        let display = error.to_string();
        assert!(display.contains("Insufficient samples"));
        assert!(display.contains("download 10MB"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::network("network"),
            AppError::http_request("http"),
            AppError::timeout("timeout"),
            AppError::validation("validation"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::test_execution("test"),
            AppError::insufficient_samples("samples"),
            AppError::cancelled("cancelled"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "NETWORK", "HTTP", "TIMEOUT", "VALIDATION", "IO",
            "PARSE", "TEST", "SAMPLES", "CANCELLED", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::network("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::test_execution("test").exit_code(), 6);
        assert_eq!(AppError::insufficient_samples("test").exit_code(), 6);
        assert_eq!(AppError::cancelled("test").exit_code(), 130);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_user_friendly_messages() {
        let error = AppError::config("Invalid URL format");
        let message = error.user_friendly_message();
        assert!(message.contains("Configuration problem"));
        assert!(message.contains("Suggestion:"));
        assert!(message.contains("Invalid URL format"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::config("Test error");
        let formatted_no_color = error.format_for_console(false);
        assert_eq!(formatted_no_color, "[CONFIG] Configuration error: Test error");

        let formatted_color = error.format_for_console(true);
        assert!(formatted_color.contains("CONFIG"));
        assert!(formatted_color.contains("Test error"));
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<i32>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let url_error = url::Url::parse("not-a-valid-url").unwrap_err();
        let app_error: AppError = url_error.into();
        assert!(app_error.to_string().contains("URL parse error"));
    }

    #[test]
    fn test_trial_error_kinds_are_distinct() {
        let errors = [
            TrialError::Timeout(Duration::from_secs(1)),
            TrialError::ConnectionFailure("refused".to_string()),
            TrialError::MalformedResponse("status 500".to_string()),
            TrialError::ShortTransfer { expected: 10, received: 3 },
            TrialError::Cancelled,
        ];
        let kinds: std::collections::HashSet<TrialErrorKind> =
            errors.iter().map(TrialError::kind).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_trial_error_retry_policy() {
        assert!(TrialError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(TrialError::ShortTransfer { expected: 10, received: 3 }.is_retryable());
        assert!(!TrialError::Cancelled.is_retryable());
    }

    #[test]
    fn test_trial_error_display() {
        let error = TrialError::ShortTransfer { expected: 100_000, received: 512 };
        assert_eq!(error.to_string(), "short transfer: expected 100000 bytes, got 512");
        assert_eq!(TrialError::Timeout(Duration::from_millis(1500)).to_string(), "no response within 1500ms");
    }
}
