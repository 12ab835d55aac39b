#![allow(dead_code)]

use async_trait::async_trait;
use host::{HostError, HostSession, Invocation, WorkloadHost};
use loadrig_core::{CatalogEntry, JobStatus, ResultRecord, RunParameters};
use orchestrator::{ControlPlane, OrchestratorConfig, OrchestratorError, ResultSink, RunContext};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const ROLE: &str = "T1";

#[derive(Debug, Clone)]
pub enum Behavior {
    Value(f64),
    Hang,
    Fail(String),
    /// First call reports a lost session, later calls succeed
    LoseSessionOnce,
}

#[derive(Debug, Clone)]
pub struct HostCall {
    pub procedure: String,
    pub session_id: String,
    pub at: Instant,
}

/// Workload host answering per procedure name; unknown procedures return 1.
#[derive(Default)]
pub struct MockHost {
    behaviors: HashMap<String, Behavior>,
    refuse_open: bool,
    lost: Mutex<HashSet<String>>,
    calls: Mutex<Vec<HostCall>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, procedure: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(procedure.to_string(), behavior);
        self
    }

    pub fn refusing_open() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn procedures(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.procedure).collect()
    }

    pub fn call_times(&self, procedure: &str, since: Instant) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter(|c| c.procedure == procedure)
            .map(|c| c.at - since)
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkloadHost for MockHost {
    async fn open(&self, target: &str) -> host::Result<HostSession> {
        if self.refuse_open {
            return Err(HostError::Unreachable("connection refused".to_string()));
        }
        let n = self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(HostSession {
            id: format!("session-{}", n),
            target: target.to_string(),
        })
    }

    async fn invoke(&self, session: &HostSession, call: &Invocation) -> host::Result<f64> {
        self.calls.lock().unwrap().push(HostCall {
            procedure: call.procedure.clone(),
            session_id: session.id.clone(),
            at: Instant::now(),
        });

        match self.behaviors.get(&call.procedure) {
            None => Ok(1.0),
            Some(Behavior::Value(v)) => Ok(*v),
            Some(Behavior::Fail(message)) => Err(HostError::Call(message.clone())),
            Some(Behavior::Hang) => {
                std::future::pending::<()>().await;
                Ok(0.0)
            }
            Some(Behavior::LoseSessionOnce) => {
                let first = self.lost.lock().unwrap().insert(call.procedure.clone());
                if first {
                    Err(HostError::SessionLost(session.id.clone()))
                } else {
                    Ok(1.0)
                }
            }
        }
    }

    async fn close(&self, _session: &HostSession) -> host::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: JobStatus,
    pub detail: String,
    pub at: Instant,
    pub stop: bool,
}

/// In-memory control plane. Signals stop once the clock reaches `stop_at`.
#[derive(Default)]
pub struct MockControlPlane {
    params: Option<RunParameters>,
    entries: Vec<CatalogEntry>,
    stop_at: Option<Instant>,
    fail_reports: bool,
    fail_catalog: bool,
    reports: Mutex<Vec<StatusReport>>,
}

impl MockControlPlane {
    pub fn new(params: RunParameters) -> Self {
        Self {
            params: Some(params),
            ..Self::default()
        }
    }

    pub fn without_parameters() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn stop_at(mut self, at: Instant) -> Self {
        self.stop_at = Some(at);
        self
    }

    pub fn failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    pub fn failing_catalog(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn details(&self) -> Vec<String> {
        self.reports().into_iter().map(|r| r.detail).collect()
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn load_run_parameters(&self, _test_id: &str) -> orchestrator::Result<Option<RunParameters>> {
        Ok(self.params)
    }

    async fn load_catalog(&self, _role: &str) -> orchestrator::Result<Vec<CatalogEntry>> {
        if self.fail_catalog {
            return Err(OrchestratorError::Io(std::io::Error::other("store offline")));
        }
        Ok(self.entries.clone())
    }

    async fn report_status(
        &self,
        _test_id: &str,
        _identity: &str,
        status: JobStatus,
        detail: &str,
    ) -> orchestrator::Result<bool> {
        if self.fail_reports {
            return Err(OrchestratorError::Io(std::io::Error::other("database is locked")));
        }

        let now = Instant::now();
        let stop = self.stop_at.is_some_and(|at| now >= at);
        self.reports.lock().unwrap().push(StatusReport {
            status,
            detail: detail.to_string(),
            at: now,
            stop,
        });
        Ok(stop)
    }
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn append(&self, record: &ResultRecord) -> orchestrator::Result<bool> {
        self.records.lock().unwrap().push(record.clone());
        Ok(true)
    }
}

pub fn params(main_minutes: u32, main_iterations: u32) -> RunParameters {
    RunParameters {
        main_duration_minutes: main_minutes,
        main_iterations,
        second_duration_minutes: 0,
        second_iterations: 0,
        wait_before_start_seconds: 0,
    }
}

pub fn entry(phase: &str, procedure: &str) -> CatalogEntry {
    CatalogEntry {
        phase: phase.to_string(),
        module: "Workload".to_string(),
        procedure: procedure.to_string(),
        parameter: format!("{}-param", procedure),
        interval_secs: 0,
        throughput: 1,
        timeout_secs: 2,
        sequence: 0,
        role: ROLE.to_string(),
    }
}

pub fn inner(procedure: &str, interval_secs: i64) -> CatalogEntry {
    CatalogEntry {
        interval_secs,
        ..entry("INNER", procedure)
    }
}

pub fn ctx() -> RunContext {
    RunContext {
        test_id: "T-100".to_string(),
        role: ROLE.to_string(),
        identity: "10.0.0.5".to_string(),
        target: "workbook.xlsm".to_string(),
    }
}

pub fn config(poll_secs: u64) -> OrchestratorConfig {
    OrchestratorConfig::default().with_poll_interval(Duration::from_secs(poll_secs))
}
