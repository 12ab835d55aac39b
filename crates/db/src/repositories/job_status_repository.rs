use crate::error::DbError;
use crate::models::{datetime_to_timestamp, JobStatusHistoryRow, JobStatusRow};
use chrono::Utc;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct JobStatusRepository {
    pool: SqlitePool,
}

impl JobStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store the agent's current status and append it to the history,
    /// atomically.
    pub async fn record(
        &self,
        test_id: &str,
        identity: &str,
        status: &str,
        details: &str,
    ) -> Result<(), DbError> {
        let now = datetime_to_timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO job_status (identity, test_id, status, details, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(identity) DO UPDATE SET
                test_id = excluded.test_id,
                status = excluded.status,
                details = excluded.details,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(identity)
        .bind(test_id)
        .bind(status)
        .bind(details)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO job_status_history (identity, test_id, status, details, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(identity)
        .bind(test_id)
        .bind(status)
        .bind(details)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find(&self, identity: &str) -> Result<Option<JobStatusRow>, DbError> {
        let row: Option<JobStatusRow> = sqlx::query_as(
            r#"
            SELECT identity, test_id, status, details, updated_at
            FROM job_status
            WHERE identity = ?
            "#,
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_test(&self, test_id: &str) -> Result<Vec<JobStatusRow>, DbError> {
        let rows: Vec<JobStatusRow> = sqlx::query_as(
            r#"
            SELECT identity, test_id, status, details, updated_at
            FROM job_status
            WHERE test_id = ?
            ORDER BY identity
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn history(&self, identity: &str) -> Result<Vec<JobStatusHistoryRow>, DbError> {
        let rows: Vec<JobStatusHistoryRow> = sqlx::query_as(
            r#"
            SELECT id, identity, test_id, status, details, recorded_at
            FROM job_status_history
            WHERE identity = ?
            ORDER BY id
            "#,
        )
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
