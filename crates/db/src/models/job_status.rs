use chrono::{DateTime, Utc};

use super::timestamp_to_datetime;

/// Latest status pushed by one agent.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobStatusRow {
    pub identity: String,
    pub test_id: String,
    pub status: String,
    pub details: String,
    pub updated_at: i64,
}

impl JobStatusRow {
    pub fn updated_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.updated_at)
    }
}

/// Every status an agent ever pushed, oldest first when read back.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobStatusHistoryRow {
    pub id: i64,
    pub identity: String,
    pub test_id: String,
    pub status: String,
    pub details: String,
    pub recorded_at: i64,
}

impl JobStatusHistoryRow {
    pub fn recorded_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.recorded_at)
    }
}
