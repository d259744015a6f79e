//! Command-line interface definitions

use clap::Parser;

/// Network Speed Tester - measures latency, jitter, download and upload throughput
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, long_version = crate::LONG_VERSION, about, long_about = None)]
pub struct Cli {
    /// Print the report as JSON (throughput in bits per second)
    #[arg(long)]
    pub json: bool,

    /// Show throughput in bits per second instead of megabits
    #[arg(long)]
    pub bps: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Base URL of the speed test service
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Number of latency probes
    #[arg(long, value_name = "COUNT")]
    pub latency_count: Option<u32>,

    /// Download tests as LABEL:REPS pairs, e.g. "100KB:10,1MB:8"
    #[arg(long, value_name = "TESTS")]
    pub download: Option<String>,

    /// Upload tests as LABEL:REPS pairs, e.g. "100KB:8,1MB:6"
    #[arg(long, value_name = "TESTS")]
    pub upload: Option<String>,

    /// Skip the latency test
    #[arg(long)]
    pub no_latency: bool,

    /// Skip download tests
    #[arg(long)]
    pub no_download: bool,

    /// Skip upload tests
    #[arg(long)]
    pub no_upload: bool,

    /// Per-trial timeout in seconds
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_duration)]
    pub connect_timeout: Option<u64>,

    /// Extra attempts for a failed trial
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Trials of one test run concurrently
    #[arg(long, value_name = "COUNT")]
    pub parallelism: Option<usize>,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && !self.json && supports_color()
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line overrides:\n");
        if let Some(ref base_url) = self.base_url {
            summary.push_str(&format!("  Base URL: {}\n", base_url));
        }
        if let Some(count) = self.latency_count {
            summary.push_str(&format!("  Latency count: {}\n", count));
        }
        if let Some(ref download) = self.download {
            summary.push_str(&format!("  Download tests: {}\n", download));
        }
        if let Some(ref upload) = self.upload {
            summary.push_str(&format!("  Upload tests: {}\n", upload));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}s\n", timeout));
        }
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 600 {
                Err("Duration cannot exceed 600 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
