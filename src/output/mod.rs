//! Output formatting for run reports
//!
//! Two renderers share the [`OutputFormatter`] trait: a JSON renderer that
//! serializes the [`RunReport`] unchanged, and a line-oriented text renderer
//! for terminals.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::{FormattingOptions, TextFormatter};

use crate::{error::Result, models::{Config, RunReport}};

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Render a whole run report
    fn format_report(&self, report: &RunReport) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> String;

    /// Format error messages
    fn format_error(&self, error: &str) -> String;
}

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Formatter matching the output flags of a configuration
    pub fn create(config: &Config) -> Box<dyn OutputFormatter> {
        if config.json {
            Box::new(JsonFormatter::new())
        } else {
            Box::new(TextFormatter::new(FormattingOptions::from(config)))
        }
    }

    /// Plain text formatter for scripts and logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Box::new(TextFormatter::new(FormattingOptions::default()))
    }
}
