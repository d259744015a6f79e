//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{config::parse_bucket_plans, Config},
};
use std::path::PathBuf;

/// Combines defaults, .env file, environment variables and CLI arguments
pub struct ConfigParser {
    cli: Cli,
    env_file: PathBuf,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli, env_file: PathBuf::from(".env") }
    }

    /// Read variables from a different .env file
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        if self.cli.debug {
            if let Some(problems) = EnvManager::check_env_file(&self.env_file)? {
                for problem in problems {
                    eprintln!("{}: {}", self.env_file.display(), problem);
                }
            }
        }
        EnvManager::load_env_file(&self.env_file, self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(ref base_url) = cli.base_url {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(count) = cli.latency_count {
            config.latency_count = count;
        }
        if let Some(ref tests) = cli.download {
            config.download_tests = parse_bucket_plans(tests)
                .map_err(|e| AppError::config(format!("Invalid --download value '{}': {}", tests, e)))?;
        }
        if let Some(ref tests) = cli.upload {
            config.upload_tests = parse_bucket_plans(tests)
                .map_err(|e| AppError::config(format!("Invalid --upload value '{}': {}", tests, e)))?;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(timeout) = cli.connect_timeout {
            config.connect_timeout_seconds = timeout;
        }
        if let Some(retries) = cli.retries {
            config.max_retries = retries;
        }
        if let Some(parallelism) = cli.parallelism {
            config.parallelism = parallelism;
        }

        // Skip flags only ever disable a test
        config.skip_latency |= cli.no_latency;
        config.skip_download |= cli.no_download;
        config.skip_upload |= cli.no_upload;

        if cli.no_color || cli.json {
            config.enable_color = false;
        }

        // CLI-only
        config.verbose = cli.verbose;
        config.debug = cli.debug;
        config.json = cli.json;
        config.bits_per_second = cli.bps;

        if config.debug {
            eprint!("{}", cli.get_config_summary());
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let plans = |skipped: bool, plans: &[crate::models::config::BucketPlan]| {
        if skipped {
            "skipped".to_string()
        } else {
            plans.iter().map(|plan| plan.to_string()).collect::<Vec<_>>().join(", ")
        }
    };

    let mut summary = Vec::new();
    summary.push(format!("Base URL: {}", config.base_url));
    summary.push(format!(
        "Latency Count: {}",
        if config.skip_latency { "skipped".to_string() } else { config.latency_count.to_string() }
    ));
    summary.push(format!("Download Tests: {}", plans(config.skip_download, &config.download_tests)));
    summary.push(format!("Upload Tests: {}", plans(config.skip_upload, &config.upload_tests)));
    summary.push(format!("Timeout: {}s (connect {}s)", config.timeout_seconds, config.connect_timeout_seconds));
    summary.push(format!("Retries: {}", config.max_retries));
    summary.push(format!("Parallelism: {}", config.parallelism));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
