use chrono::{DateTime, Utc};
use loadrig_core::RunParameters;

use super::{datetime_to_timestamp, timestamp_to_datetime};

/// A row of `test_control`: the run parameters and lifecycle of one test.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TestControlRow {
    pub test_id: String,
    pub main_duration_min: i64,
    pub main_iterations: i64,
    pub second_duration_min: i64,
    pub second_iterations: i64,
    pub wait_before_start_sec: i64,
    pub status: String,
    pub end_time: Option<i64>,
    pub created_at: i64,
}

impl TestControlRow {
    pub fn new(test_id: impl Into<String>, params: &RunParameters) -> Self {
        Self {
            test_id: test_id.into(),
            main_duration_min: i64::from(params.main_duration_minutes),
            main_iterations: i64::from(params.main_iterations),
            second_duration_min: i64::from(params.second_duration_minutes),
            second_iterations: i64::from(params.second_iterations),
            wait_before_start_sec: i64::from(params.wait_before_start_seconds),
            status: "Pending".to_string(),
            end_time: None,
            created_at: datetime_to_timestamp(Utc::now()),
        }
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(datetime_to_timestamp(end_time));
        self
    }

    /// Negative values stored by hand are read as zero, oversized ones as
    /// `u32::MAX`.
    pub fn into_params(self) -> RunParameters {
        RunParameters {
            main_duration_minutes: clamp_u32(self.main_duration_min),
            main_iterations: clamp_u32(self.main_iterations),
            second_duration_minutes: clamp_u32(self.second_duration_min),
            second_iterations: clamp_u32(self.second_iterations),
            wait_before_start_seconds: clamp_u32(self.wait_before_start_sec),
        }
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time.map(timestamp_to_datetime)
    }
}

fn clamp_u32(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}
