//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
    types::{Direction, PayloadBucket},
};
use colored::Colorize;

/// Transfer volume above which a run is flagged as heavy
const LARGE_RUN_BYTES: u64 = 500_000_000;

/// Trial count above which a run is flagged as long
const LARGE_RUN_TRIALS: u64 = 200;

/// Configuration validator producing non-fatal warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run `Config::validate`, then collect advisory warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_base_url(&config.base_url));
        warnings.extend(Self::validate_selection(config));
        warnings.extend(Self::validate_performance_settings(config));

        Ok(warnings)
    }

    fn validate_base_url(base_url: &str) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let Ok(parsed) = url::Url::parse(base_url) else {
            return warnings;
        };

        if parsed.scheme() == "http" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Base URL '{}' uses HTTP instead of HTTPS", base_url),
            ));
        }

        // `Url::port` is `None` for the scheme's default port
        if let Some(port) = parsed.port() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Base URL '{}' uses non-standard port {}", base_url, port),
            ));
        }

        if parsed.query().is_some() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Base URL '{}' includes query parameters, which are dropped from test requests", base_url),
            ));
        }

        warnings
    }

    fn validate_selection(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let selection = config.test_selection();

        if selection.is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "All tests are disabled; only metadata will be reported".to_string(),
            ));
            return warnings;
        }

        if let Some(count) = selection.latency_repetitions {
            if count < 3 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Latency count of {} gives an unreliable jitter estimate (recommended: >= 3)", count),
                ));
            }
        }

        for direction in [Direction::Down, Direction::Up] {
            let plans = config.plans_for(direction);
            if plans.iter().map(|plan| plan.repetitions).sum::<u32>() == 1 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Only one {} trial requested; the 90th percentile equals that single sample", direction.kind()),
                ));
            }
        }

        let total_trials = Self::total_trials(config);
        let total_bytes = Self::total_bytes(config);

        if total_trials > LARGE_RUN_TRIALS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Configuration will perform {} trials, which may take a long time", total_trials),
            ));
        }

        if total_bytes > LARGE_RUN_BYTES {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Configuration will transfer about {} MB", total_bytes / 1_000_000),
            ));
        }

        warnings
    }

    fn validate_performance_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let largest = [Direction::Down, Direction::Up]
            .into_iter()
            .flat_map(|direction| config.plans_for(direction))
            .map(|plan| plan.bucket)
            .max();

        if config.timeout_seconds < 5 && largest >= Some(PayloadBucket::Mb10) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Timeout of {}s may be too short for {} transfers",
                    config.timeout_seconds,
                    largest.map_or("large", |bucket| bucket.label()),
                ),
            ));
        } else if config.timeout_seconds < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}s may be too short for reliable measurements", config.timeout_seconds),
            ));
        }

        if config.connect_timeout_seconds > config.timeout_seconds {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Connect timeout ({}s) exceeds the per-trial deadline ({}s) and will never fire",
                    config.connect_timeout_seconds, config.timeout_seconds
                ),
            ));
        }

        if config.parallelism > 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Parallelism of {} makes trials share bandwidth; per-trial throughput will be lower",
                    config.parallelism
                ),
            ));
        }

        if config.max_retries == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Retries are disabled; any transient failure drops the trial".to_string(),
            ));
        }

        warnings
    }

    /// Number of trials the configuration requests
    pub fn total_trials(config: &Config) -> u64 {
        let selection = config.test_selection();
        let latency = selection.latency_repetitions.unwrap_or(0) as u64;
        let throughput: u64 = selection
            .download
            .iter()
            .chain(&selection.upload)
            .map(|plan| plan.repetitions as u64)
            .sum();
        latency + throughput
    }

    /// Payload bytes the configuration transfers, excluding retries
    pub fn total_bytes(config: &Config) -> u64 {
        let selection = config.test_selection();
        selection
            .download
            .iter()
            .chain(&selection.upload)
            .map(|plan| plan.bucket.size_bytes() * plan.repetitions as u64)
            .sum()
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().bold().to_string(),
            }
        } else {
            tag
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::BucketPlan;

    fn has_warning(warnings: &[ValidationWarning], needle: &str) -> bool {
        warnings.iter().any(|w| w.message.contains(needle))
    }

    #[test]
    fn test_validation_warning_format() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "Test warning message".to_string());
        let formatted = warning.format(false);
        assert_eq!(formatted, "[WARNING] Test warning message");
    }

    #[test]
    fn test_default_config_has_no_warnings() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut config = Config::default();
        config.parallelism = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_plain_http_and_port_warnings() {
        let mut config = Config::default();
        config.base_url = "http://127.0.0.1:8080".to_string();
        let warnings = validate_config(&config).unwrap();

        assert!(warnings.iter().any(|w| w.level == ValidationLevel::Warning && w.message.contains("HTTP instead of HTTPS")));
        assert!(warnings.iter().any(|w| w.level == ValidationLevel::Info && w.message.contains("port 8080")));
    }

    #[test]
    fn test_everything_skipped_warning() {
        let mut config = Config::default();
        config.skip_latency = true;
        config.skip_download = true;
        config.skip_upload = true;
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "All tests are disabled"));
    }

    #[test]
    fn test_large_matrix_warnings() {
        let mut config = Config::default();
        config.download_tests = vec![BucketPlan::new(PayloadBucket::Mb25, 30)];
        config.latency_count = 300;
        config.skip_upload = true;
        let warnings = validate_config(&config).unwrap();

        assert!(has_warning(&warnings, "trials"));
        assert!(has_warning(&warnings, "750 MB"));
    }

    #[test]
    fn test_totals() {
        let config = Config::default();
        // 20 latency + 28 download + 18 upload
        assert_eq!(ConfigValidator::total_trials(&config), 66);
        // 10*100KB + 8*1MB + 6*10MB + 4*25MB down, 8*100KB + 6*1MB + 4*10MB up
        assert_eq!(ConfigValidator::total_bytes(&config), 169_000_000 + 46_800_000);
    }

    #[test]
    fn test_short_timeout_with_large_buckets() {
        let mut config = Config::default();
        config.timeout_seconds = 4;
        config.connect_timeout_seconds = 2;
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "too short for 25MB"));
    }

    #[test]
    fn test_parallelism_and_retry_warnings() {
        let mut config = Config::default();
        config.parallelism = 4;
        config.max_retries = 0;
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "share bandwidth"));
        assert!(has_warning(&warnings, "Retries are disabled"));
    }

    #[test]
    fn test_single_trial_percentile_note() {
        let mut config = Config::default();
        config.upload_tests = vec![BucketPlan::new(PayloadBucket::Kb100, 1)];
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "Only one upload trial"));
    }
}
