mod common;

use common::{entry, MockHost, ROLE};
use db::{connect, JobStatusRepository, TestCaseRepository, TestControlRepository, TestControlRow};
use loadrig_core::{RunParameters, RunStage};
use orchestrator::{
    FileResultLog, Orchestrator, OrchestratorConfig, ResultLogPolicy, RunContext, SqlControlPlane,
};
use std::sync::Arc;
use tempfile::TempDir;

fn zero_window() -> RunParameters {
    RunParameters {
        main_duration_minutes: 0,
        main_iterations: 1,
        second_duration_minutes: 0,
        second_iterations: 0,
        wait_before_start_seconds: 0,
    }
}

fn context() -> RunContext {
    RunContext {
        test_id: "T-200".to_string(),
        role: ROLE.to_string(),
        identity: "10.0.0.9".to_string(),
        target: "workbook.xlsm".to_string(),
    }
}

async fn seed(pool: &db::SqlitePool) {
    TestControlRepository::new(pool.clone())
        .upsert(&TestControlRow::new("T-200", &zero_window()))
        .await
        .unwrap();

    let cases = TestCaseRepository::new(pool.clone());
    for e in [entry("PSO", "Setup"), entry("START", "Open"), entry("PSC", "Teardown")] {
        cases.create(&e).await.unwrap();
    }
}

#[tokio::test]
async fn test_run_against_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let pool = connect("sqlite::memory:").await.unwrap();
    seed(&pool).await;

    let log_path = dir.path().join("results.log");
    let sink = Arc::new(FileResultLog::create(&log_path, ResultLogPolicy::All).await.unwrap());
    let host = Arc::new(MockHost::new());

    let orchestrator = Orchestrator::new(
        Arc::new(SqlControlPlane::new(pool.clone())),
        host.clone(),
        sink,
        OrchestratorConfig::default(),
    );
    let report = orchestrator.run(&context()).await.unwrap();

    assert_eq!(report.stage, RunStage::Completed);
    assert_eq!(report.iterations, 0);
    assert_eq!(host.procedures(), vec!["Setup", "Teardown"]);

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines[0], "Timestamp,Result,Parameter");
    assert!(lines[1].ends_with(",1,Setup-param"));
    assert!(lines[2].ends_with(",1,Teardown-param"));

    let history = JobStatusRepository::new(pool).history("10.0.0.9").await.unwrap();
    let details: Vec<_> = history.iter().map(|h| h.details.as_str()).collect();
    assert_eq!(details, vec!["Test START", "Test Completed"]);
    assert_eq!(history[1].status, "Completed");
}

#[tokio::test]
async fn test_aborted_test_skips_main_loop() {
    let dir = TempDir::new().unwrap();
    let pool = connect("sqlite::memory:").await.unwrap();
    seed(&pool).await;
    TestControlRepository::new(pool.clone())
        .set_status("T-200", "Aborted")
        .await
        .unwrap();

    let sink = Arc::new(
        FileResultLog::create(dir.path().join("results.log"), ResultLogPolicy::SuccessOnly)
            .await
            .unwrap(),
    );
    let orchestrator = Orchestrator::new(
        Arc::new(SqlControlPlane::new(pool.clone())),
        Arc::new(MockHost::new()),
        sink,
        OrchestratorConfig::default(),
    );
    let report = orchestrator.run(&context()).await.unwrap();

    assert_eq!(report.stage, RunStage::Aborted);

    let latest = JobStatusRepository::new(pool).find("10.0.0.9").await.unwrap().unwrap();
    assert_eq!(latest.status, "Aborted");
    assert_eq!(latest.details, "Test Aborted");
}
