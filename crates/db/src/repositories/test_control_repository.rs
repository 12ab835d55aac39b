use crate::error::DbError;
use crate::models::{datetime_to_timestamp, TestControlRow};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct TestControlRepository {
    pool: SqlitePool,
}

impl TestControlRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, row: &TestControlRow) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO test_control (test_id, main_duration_min, main_iterations, second_duration_min, second_iterations, wait_before_start_sec, status, end_time, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(test_id) DO UPDATE SET
                main_duration_min = excluded.main_duration_min,
                main_iterations = excluded.main_iterations,
                second_duration_min = excluded.second_duration_min,
                second_iterations = excluded.second_iterations,
                wait_before_start_sec = excluded.wait_before_start_sec,
                status = excluded.status,
                end_time = excluded.end_time
            "#,
        )
        .bind(&row.test_id)
        .bind(row.main_duration_min)
        .bind(row.main_iterations)
        .bind(row.second_duration_min)
        .bind(row.second_iterations)
        .bind(row.wait_before_start_sec)
        .bind(&row.status)
        .bind(row.end_time)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find(&self, test_id: &str) -> Result<Option<TestControlRow>, DbError> {
        let row: Option<TestControlRow> = sqlx::query_as(
            r#"
            SELECT test_id, main_duration_min, main_iterations, second_duration_min, second_iterations, wait_before_start_sec, status, end_time, created_at
            FROM test_control
            WHERE test_id = ?
            "#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn set_status(&self, test_id: &str, status: &str) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE test_control SET status = ? WHERE test_id = ?")
            .bind(status)
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TestNotFound(test_id.to_string()));
        }
        Ok(())
    }

    pub async fn set_end_time(&self, test_id: &str, end_time: Option<DateTime<Utc>>) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE test_control SET end_time = ? WHERE test_id = ?")
            .bind(end_time.map(datetime_to_timestamp))
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TestNotFound(test_id.to_string()));
        }
        Ok(())
    }

    /// Whether the test is over from the control plane's point of view:
    /// its recorded end time has passed or it carries a terminal status.
    pub async fn is_ended(&self, test_id: &str, now: DateTime<Utc>) -> Result<bool, DbError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT test_id
            FROM test_control
            WHERE test_id = ?
              AND ((end_time IS NOT NULL AND end_time < ?) OR status IN ('Aborted', 'Completed'))
            LIMIT 1
            "#,
        )
        .bind(test_id)
        .bind(datetime_to_timestamp(now))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}
