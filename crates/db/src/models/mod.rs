mod job_status;
mod test_case;
mod test_control;

pub use job_status::{JobStatusHistoryRow, JobStatusRow};
pub use test_case::TestCaseRow;
pub use test_control::TestControlRow;

use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

pub(crate) fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}
