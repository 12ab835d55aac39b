use async_trait::async_trait;
use chrono::Utc;
use db::{JobStatusRepository, TestCaseRepository, TestControlRepository};
use loadrig_core::{CatalogEntry, JobStatus, RunParameters};
use db::SqlitePool;
use tracing::debug;

use crate::error::Result;

/// The shared store that configures runs and collects agent status.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// `None` when no parameters are stored for `test_id`.
    async fn load_run_parameters(&self, test_id: &str) -> Result<Option<RunParameters>>;

    /// Catalog rows for `role`, ordered by `(phase, sequence)`.
    async fn load_catalog(&self, role: &str) -> Result<Vec<CatalogEntry>>;

    /// Push `(identity, status, detail)` and return whether the run should
    /// stop: the test carries a terminal status or its end time has passed.
    async fn report_status(
        &self,
        test_id: &str,
        identity: &str,
        status: JobStatus,
        detail: &str,
    ) -> Result<bool>;
}

/// Control plane backed by the SQLite store.
#[derive(Clone)]
pub struct SqlControlPlane {
    test_control: TestControlRepository,
    test_cases: TestCaseRepository,
    job_status: JobStatusRepository,
}

impl SqlControlPlane {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            test_control: TestControlRepository::new(pool.clone()),
            test_cases: TestCaseRepository::new(pool.clone()),
            job_status: JobStatusRepository::new(pool),
        }
    }
}

#[async_trait]
impl ControlPlane for SqlControlPlane {
    async fn load_run_parameters(&self, test_id: &str) -> Result<Option<RunParameters>> {
        let row = self.test_control.find(test_id).await?;
        Ok(row.map(|r| r.into_params()))
    }

    async fn load_catalog(&self, role: &str) -> Result<Vec<CatalogEntry>> {
        Ok(self.test_cases.find_for_role(role).await?)
    }

    async fn report_status(
        &self,
        test_id: &str,
        identity: &str,
        status: JobStatus,
        detail: &str,
    ) -> Result<bool> {
        self.job_status
            .record(test_id, identity, status.as_str(), detail)
            .await?;

        let ended = self.test_control.is_ended(test_id, Utc::now()).await?;
        debug!(test_id = %test_id, status = %status.as_str(), detail = %detail, ended, "Status reported");
        Ok(ended)
    }
}
