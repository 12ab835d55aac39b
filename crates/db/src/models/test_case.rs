use loadrig_core::CatalogEntry;

/// A row of `test_case`: one procedure of the catalog.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TestCaseRow {
    pub id: i64,
    pub phase: String,
    pub module_name: String,
    pub function_name: String,
    pub parameter: String,
    pub interval_sec: i64,
    pub throughput: i64,
    pub timeout_sec: i64,
    pub sequence: i64,
    pub user_role: String,
}

impl TestCaseRow {
    pub fn into_entry(self) -> CatalogEntry {
        CatalogEntry {
            phase: self.phase,
            module: self.module_name,
            procedure: self.function_name,
            parameter: self.parameter,
            interval_secs: self.interval_sec,
            throughput: self.throughput,
            timeout_secs: self.timeout_sec,
            sequence: self.sequence,
            role: self.user_role,
        }
    }
}
