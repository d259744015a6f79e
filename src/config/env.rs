//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::config::parse_bucket_plans;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load a .env file if it exists; variables already set in the process win
    pub fn load_env_file(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SPEEDTEST_BASE_URL" => {
                let parsed = url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("{} must use http or https: {}", key, value)));
                }
            }
            "SPEEDTEST_DOWNLOAD_TESTS" | "SPEEDTEST_UPLOAD_TESTS" => {
                let plans = parse_bucket_plans(value)
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if let Some(plan) = plans.iter().find(|plan| plan.repetitions == 0) {
                    return Err(AppError::config(format!("{} entry {} has zero repetitions", key, plan)));
                }
            }
            "SPEEDTEST_LATENCY_COUNT" => {
                let count: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if count == 0 || count > 1000 {
                    return Err(AppError::config(format!("{} must be between 1 and 1000, got: {}", key, count)));
                }
            }
            "SPEEDTEST_TIMEOUT_SECONDS" | "SPEEDTEST_CONNECT_TIMEOUT_SECONDS" => {
                let timeout: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if timeout == 0 || timeout > 600 {
                    return Err(AppError::config(format!("{} must be between 1 and 600, got: {}", key, timeout)));
                }
            }
            "SPEEDTEST_MAX_RETRIES" => {
                let retries: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if retries > 10 {
                    return Err(AppError::config(format!("{} must be at most 10, got: {}", key, retries)));
                }
            }
            "SPEEDTEST_PARALLELISM" => {
                let parallelism: usize = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if parallelism == 0 || parallelism > 16 {
                    return Err(AppError::config(format!("{} must be between 1 and 16, got: {}", key, parallelism)));
                }
            }
            "SPEEDTEST_ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEEDTEST_BASE_URL", "Speed test service base URL", "https://speed.cloudflare.com"),
            ("SPEEDTEST_LATENCY_COUNT", "Number of latency probes (1-1000)", "20"),
            ("SPEEDTEST_DOWNLOAD_TESTS", "Download tests as LABEL:REPS list", "100KB:10,1MB:8"),
            ("SPEEDTEST_UPLOAD_TESTS", "Upload tests as LABEL:REPS list", "100KB:8,1MB:6"),
            ("SPEEDTEST_TIMEOUT_SECONDS", "Per-trial deadline in seconds (1-600)", "25"),
            ("SPEEDTEST_CONNECT_TIMEOUT_SECONDS", "Connection timeout in seconds (1-600)", "10"),
            ("SPEEDTEST_MAX_RETRIES", "Extra attempts per failed trial (0-10)", "2"),
            ("SPEEDTEST_PARALLELISM", "Concurrent trials per test (1-16)", "1"),
            ("SPEEDTEST_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Check a .env style file and report invalid lines; `None` if it does not exist
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let known = Self::get_supported_env_vars().iter().any(|(name, _, _)| *name == key);
                if key.starts_with("SPEEDTEST_") && !known {
                    warnings.push(format!("Line '{}': unknown variable {}", line, key));
                } else if let Err(e) = Self::validate_env_var(key, value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
