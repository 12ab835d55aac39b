use crate::error::DbError;
use crate::models::TestCaseRow;
use loadrig_core::CatalogEntry;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct TestCaseRepository {
    pool: SqlitePool,
}

impl TestCaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, entry: &CatalogEntry) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO test_case (phase, module_name, function_name, parameter, interval_sec, throughput, timeout_sec, sequence, user_role)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.phase)
        .bind(&entry.module)
        .bind(&entry.procedure)
        .bind(&entry.parameter)
        .bind(entry.interval_secs)
        .bind(entry.throughput)
        .bind(entry.timeout_secs)
        .bind(entry.sequence)
        .bind(&entry.role)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Catalog rows for a run role, ordered by `(phase, sequence)`.
    ///
    /// A row applies when its role equals the run role or the run role's
    /// first character.
    pub async fn find_for_role(&self, role: &str) -> Result<Vec<CatalogEntry>, DbError> {
        let rows: Vec<TestCaseRow> = sqlx::query_as(
            r#"
            SELECT id, phase, module_name, function_name, parameter, interval_sec, throughput, timeout_sec, sequence, user_role
            FROM test_case
            WHERE user_role = ? OR user_role = substr(?, 1, 1)
            ORDER BY phase, sequence, id
            "#,
        )
        .bind(role)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }
}
