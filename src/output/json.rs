//! JSON report rendering

use super::OutputFormatter;
use crate::{error::Result, models::RunReport};

/// Serializes the report as pretty-printed JSON, throughput in bits per second
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    // Messages travel on stderr next to the JSON document, so keep them plain
    fn format_warning(&self, warning: &str) -> String {
        format!("Warning: {}", warning)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrialErrorKind;
    use crate::models::{FailedSpec, TestMetadata, TestResult};
    use crate::types::{PayloadBucket, TestKind};
    use chrono::Utc;

    #[test]
    fn test_report_json_shape() {
        let mut result = TestResult::from_metadata(TestMetadata {
            ip: Some("198.51.100.4".to_string()),
            ..Default::default()
        });
        result.down_1mb_bps = Some(95_000_000.0);
        result.percentile_90_down_bps = Some(99_000_000.0);

        let report = RunReport {
            run_id: "abc".to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            result,
            failures: vec![FailedSpec {
                kind: TestKind::Upload,
                bucket: Some(PayloadBucket::Mb10),
                attempted: 4,
                last_error: Some(TrialErrorKind::Timeout),
            }],
            requested_specs: 2,
            cancelled: false,
        };

        let json = JsonFormatter::new().format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["run_id"], "abc");
        assert_eq!(value["result"]["ip"], "198.51.100.4");
        assert_eq!(value["result"]["1MB_down_bps"], 95_000_000.0);
        assert_eq!(value["result"]["90th_percentile_down_bps"], 99_000_000.0);
        assert!(value["result"].get("1MB_up_bps").is_none());
        assert!(value["result"].get("latency_seconds").is_none());
        assert_eq!(value["failures"][0]["kind"], "upload");
        assert_eq!(value["failures"][0]["bucket"], "10MB");
    }
}
