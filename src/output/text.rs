//! Line-oriented text rendering

use super::OutputFormatter;
use crate::{
    error::Result,
    models::{Config, RunReport, TestResult},
    types::{Direction, PayloadBucket},
};
use colored::{ColoredString, Colorize};
use std::fmt::Write as _;

/// Options for the text renderer
#[derive(Debug, Clone, Default)]
pub struct FormattingOptions {
    pub enable_color: bool,
    /// Keep throughput in bits per second instead of megabits
    pub bits_per_second: bool,
    /// Include run bookkeeping lines
    pub verbose: bool,
}

impl From<&Config> for FormattingOptions {
    fn from(config: &Config) -> Self {
        Self {
            enable_color: config.enable_color,
            bits_per_second: config.bits_per_second,
            verbose: config.verbose || config.debug,
        }
    }
}

/// One `key: value` line per present field, then a failure section
#[derive(Debug, Clone)]
pub struct TextFormatter {
    options: FormattingOptions,
}

impl TextFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.options.enable_color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn line(&self, out: &mut String, key: &str, value: &str) {
        let _ = writeln!(out, "{}: {}", self.paint(key, |s| s.bold()), self.paint(value, |s| s.green()));
    }

    fn throughput_key(&self, base: &str) -> String {
        if self.options.bits_per_second {
            format!("{}_bps", base)
        } else {
            format!("{}_mbps", base)
        }
    }

    fn throughput_value(&self, bits_per_second: f64) -> String {
        if self.options.bits_per_second {
            format!("{:.0}", bits_per_second)
        } else {
            format!("{:.2}", bits_per_second / 1e6)
        }
    }

    fn format_result(&self, result: &TestResult, out: &mut String) {
        let metadata = [
            ("ip", &result.ip),
            ("isp", &result.isp),
            ("location_code", &result.location_code),
            ("location_city", &result.location_city),
            ("location_region", &result.location_region),
        ];
        for (key, value) in metadata {
            if let Some(value) = value {
                self.line(out, key, value);
            }
        }

        if let Some(latency) = result.latency_seconds {
            self.line(out, "latency", &format!("{:.2} ms", latency * 1e3));
        }
        if let Some(jitter) = result.jitter_seconds {
            self.line(out, "jitter", &format!("{:.2} ms", jitter * 1e3));
        }

        for direction in [Direction::Down, Direction::Up] {
            for bucket in PayloadBucket::ALL {
                if let Some(bps) = result.bucket_bps(direction, bucket) {
                    let key = self.throughput_key(&format!("{}_{}", bucket.label(), direction.as_str()));
                    self.line(out, &key, &self.throughput_value(bps));
                }
            }
        }

        for direction in [Direction::Down, Direction::Up] {
            if let Some(bps) = result.percentile_90_bps(direction) {
                let key = self.throughput_key(&format!("90th_percentile_{}", direction.as_str()));
                self.line(out, &key, &self.throughput_value(bps));
            }
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();

        if self.options.verbose {
            self.line(&mut out, "run_id", &report.run_id);
            let elapsed = report.completed_at - report.started_at;
            self.line(&mut out, "duration", &format!("{:.1} s", elapsed.num_milliseconds() as f64 / 1e3));
        }

        self.format_result(&report.result, &mut out);

        if !report.failures.is_empty() {
            let _ = writeln!(
                out,
                "\n{}",
                self.paint(
                    &format!("Failed tests ({} of {}):", report.failures.len(), report.requested_specs),
                    |s| s.red().bold()
                )
            );
            for failure in &report.failures {
                let _ = writeln!(out, "  - {}", self.paint(&failure.describe(), |s| s.red()));
            }
        }

        if report.cancelled {
            let _ = writeln!(out, "\n{}", self.paint("Run cancelled; results are partial", |s| s.yellow()));
        }

        Ok(out)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("{} {}", self.paint("Warning:", |s| s.yellow().bold()), warning)
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}", self.paint("Error:", |s| s.red().bold()), error)
    }
}
