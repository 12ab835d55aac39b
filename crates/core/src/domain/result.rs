use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::phase::Phase;

/// Value written for timeouts and errors. Successful results are never
/// negative, so a negative value alone marks a failed call.
pub const ERROR_SENTINEL: i64 = -1;

/// Timestamp layout of the result log.
pub const RESULT_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Header line of the result log.
pub const RESULT_LOG_HEADER: &str = "Timestamp,Result,Parameter";

/// How one procedure invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(f64),
    Timeout(Duration),
    Error(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// What produced a result row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordTag {
    Procedure(Phase),
    ControlPlane,
}

/// One row of the result log. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    pub timestamp: DateTime<Local>,
    pub value: i64,
    pub parameter: String,
    pub tag: RecordTag,
}

impl ResultRecord {
    /// Record the outcome of a procedure call made with `parameter`.
    pub fn from_outcome(phase: Phase, parameter: &str, outcome: &Outcome) -> Self {
        let (value, parameter) = match outcome {
            Outcome::Success(v) => (v.trunc() as i64, parameter.to_string()),
            Outcome::Timeout(after) => (
                ERROR_SENTINEL,
                format!("{} TIMEOUT: no result after {}s", parameter, after.as_secs()),
            ),
            Outcome::Error(message) => (ERROR_SENTINEL, format!("{} ERROR: {}", parameter, message)),
        };

        Self {
            timestamp: Local::now(),
            value,
            parameter,
            tag: RecordTag::Procedure(phase),
        }
    }

    /// Record a failed exchange with the control plane.
    pub fn control_plane_error(message: &str) -> Self {
        Self {
            timestamp: Local::now(),
            value: ERROR_SENTINEL,
            parameter: format!("SQL ERROR: {}", message),
            tag: RecordTag::ControlPlane,
        }
    }

    pub fn is_error(&self) -> bool {
        self.value < 0
    }

    /// `Timestamp,Result,Parameter` line without the trailing newline.
    pub fn to_log_line(&self) -> String {
        format!(
            "{},{},{}",
            self.timestamp.format(RESULT_TIMESTAMP_FORMAT),
            self.value,
            self.parameter
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_success_truncates_value() {
        let record = ResultRecord::from_outcome(Phase::Inner, "A-100", &Outcome::Success(42.9));
        assert_eq!(record.value, 42);
        assert_eq!(record.parameter, "A-100");
        assert_eq!(record.tag, RecordTag::Procedure(Phase::Inner));
        assert!(!record.is_error());
    }

    #[test]
    fn test_timeout_uses_sentinel() {
        let record = ResultRecord::from_outcome(
            Phase::Start,
            "A-100",
            &Outcome::Timeout(Duration::from_secs(2)),
        );
        assert_eq!(record.value, ERROR_SENTINEL);
        assert!(record.is_error());
        assert!(record.parameter.starts_with("A-100 TIMEOUT"));
    }

    #[test]
    fn test_error_annotates_parameter() {
        let record = ResultRecord::from_outcome(
            Phase::End,
            "A-100",
            &Outcome::Error("division by zero".to_string()),
        );
        assert_eq!(record.value, ERROR_SENTINEL);
        assert_eq!(record.parameter, "A-100 ERROR: division by zero");
    }

    #[test]
    fn test_control_plane_error_record() {
        let record = ResultRecord::control_plane_error("database is locked");
        assert_eq!(record.tag, RecordTag::ControlPlane);
        assert_eq!(record.value, ERROR_SENTINEL);
        assert_eq!(record.parameter, "SQL ERROR: database is locked");
    }

    #[test]
    fn test_log_line_format() {
        let record = ResultRecord {
            timestamp: Local.with_ymd_and_hms(2025, 10, 23, 14, 5, 9).unwrap(),
            value: 17,
            parameter: "A-100".to_string(),
            tag: RecordTag::Procedure(Phase::Inner),
        };
        assert_eq!(record.to_log_line(), "2025/10/23 14:05:09,17,A-100");
    }
}
