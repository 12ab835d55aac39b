//! The run loop.
//!
//! A run goes `Init → PreStartOnce → MainLoop → PostCloseOnce` and ends
//! `Completed`, or `Aborted` when the control plane asked it to stop. The
//! main loop is two-tier: every outer iteration runs the `START` batch, an
//! inner loop of throttled `INNER` ticks (with the independent second
//! cadence firing `SECOND_END`), then the `END` batch.
//!
//! Stop requests are only acted on at checkpoints: the top of each outer
//! iteration, the top of each inner tick and after each `END` batch. A call
//! in flight is never interrupted by one.

use events::{EventBus, RunEvent};
use host::WorkloadHost;
use loadrig_core::{JobStatus, Phase, RunParameters, RunStage, ResultRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::ProcedureCatalog;
use crate::control::ControlPlane;
use crate::error::{OrchestratorError, Result};
use crate::executor::{CallResult, ExecutorConfig, FunctionExecutor};
use crate::result_log::ResultSink;
use crate::run_state::{offset, RunState};
use crate::throttle::IntervalThrottle;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sleep between inner-loop ticks; bounds how late a stop is noticed
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    /// Used when the control plane has no parameters for the test
    pub default_parameters: RunParameters,
    pub executor: ExecutorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(60),
            default_parameters: RunParameters {
                main_duration_minutes: 60,
                main_iterations: 1,
                second_duration_minutes: 0,
                second_iterations: 0,
                wait_before_start_seconds: 0,
            },
            executor: ExecutorConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_default_parameters(mut self, params: RunParameters) -> Self {
        self.default_parameters = params;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }
}

/// Who is running what.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub test_id: String,
    pub role: String,
    /// Reported to the control plane as the agent's key
    pub identity: String,
    /// Workload artifact the host session is opened against
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stage: RunStage,
    pub iterations: u32,
    pub second_firings: u32,
    pub total_calls: u64,
    pub failed_calls: u64,
}

#[derive(Debug, Default)]
struct CallStats {
    total: u64,
    failed: u64,
}

/// Everything one run mutates, threaded through the loop explicitly.
struct Run<'a> {
    ctx: &'a RunContext,
    params: RunParameters,
    catalog: &'a ProcedureCatalog,
    executor: &'a mut FunctionExecutor,
    state: RunState,
    throttle: IntervalThrottle,
    stats: CallStats,
}

pub struct Orchestrator {
    control: Arc<dyn ControlPlane>,
    host: Arc<dyn WorkloadHost>,
    sink: Arc<dyn ResultSink>,
    config: OrchestratorConfig,
    event_bus: Option<EventBus>,
}

impl Orchestrator {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        host: Arc<dyn WorkloadHost>,
        sink: Arc<dyn ResultSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            control,
            host,
            sink,
            config,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Execute one complete run.
    ///
    /// Only fatal startup problems are returned as errors; per-call and
    /// control-plane failures during the run are recorded and absorbed. The
    /// host session is closed on every path once it was opened.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunReport> {
        let params = self.load_parameters(ctx).await?;
        let catalog = ProcedureCatalog::load(
            self.control.as_ref(),
            &ctx.role,
            self.config.executor.default_timeout,
        )
        .await?;

        let mut executor = FunctionExecutor::new(
            Arc::clone(&self.host),
            ctx.target.clone(),
            self.config.executor.clone(),
        );
        executor
            .open()
            .await
            .map_err(|e| OrchestratorError::HostUnavailable(e.to_string()))?;

        let wait = params.wait_before_start();
        if !wait.is_zero() {
            info!(wait_secs = wait.as_secs(), "Waiting before start");
            sleep(wait).await;
        }

        let run = Run {
            ctx,
            params,
            catalog: &catalog,
            executor: &mut executor,
            state: RunState::new(&params, Instant::now()),
            throttle: IntervalThrottle::new(),
            stats: CallStats::default(),
        };
        let report = self.drive(run).await;

        executor.close().await;
        report
    }

    async fn load_parameters(&self, ctx: &RunContext) -> Result<RunParameters> {
        match self.control.load_run_parameters(&ctx.test_id).await {
            Ok(Some(params)) => {
                info!(
                    test_id = %ctx.test_id,
                    main_duration_min = params.main_duration_minutes,
                    main_iterations = params.main_iterations,
                    second_duration_min = params.second_duration_minutes,
                    second_iterations = params.second_iterations,
                    wait_before_start_sec = params.wait_before_start_seconds,
                    "Run parameters loaded"
                );
                Ok(params)
            }
            Ok(None) => {
                warn!(test_id = %ctx.test_id, "No run parameters stored, using configured defaults");
                Ok(self.config.default_parameters)
            }
            Err(e) => Err(OrchestratorError::configuration(format!(
                "cannot load run parameters for test {}: {}",
                ctx.test_id, e
            ))),
        }
    }

    async fn drive(&self, mut run: Run<'_>) -> Result<RunReport> {
        let run_id = run.state.run_id;
        info!(
            run_id = %run_id,
            test_id = %run.ctx.test_id,
            role = %run.ctx.role,
            identity = %run.ctx.identity,
            "Run started"
        );
        info!(
            main_end_in_secs = run.params.total_window().as_secs(),
            second_end_in_secs = run.params.second_window().as_secs(),
            iterations = run.params.main_iterations,
            second_iterations = run.params.second_iterations,
            "Planned schedule"
        );
        self.emit(RunEvent::RunStarted {
            run_id,
            test_id: run.ctx.test_id.clone(),
            role: run.ctx.role.clone(),
            identity: run.ctx.identity.clone(),
        });

        self.advance(&mut run, RunStage::PreStartOnce)?;
        self.run_batch(&mut run, Phase::PreStartOnce).await;
        self.report(&mut run, JobStatus::Running, "Test START").await;

        if run.state.should_stop {
            info!(run_id = %run_id, "Stop requested before the main loop");
        } else {
            self.advance(&mut run, RunStage::MainLoop)?;
            self.main_loop(&mut run).await;
        }

        self.advance(&mut run, RunStage::PostCloseOnce)?;
        self.run_batch(&mut run, Phase::PostCloseOnce).await;

        let final_stage = run.state.final_stage();
        let status = match final_stage {
            RunStage::Aborted => JobStatus::Aborted,
            _ => JobStatus::Completed,
        };
        self.report(&mut run, status, &format!("Test {}", status.as_str()))
            .await;
        self.advance(&mut run, final_stage)?;

        let report = RunReport {
            run_id,
            stage: final_stage,
            iterations: run.state.iteration_count,
            second_firings: run.state.second_iteration_count,
            total_calls: run.stats.total,
            failed_calls: run.stats.failed,
        };
        info!(
            run_id = %run_id,
            stage = %final_stage.as_str(),
            iterations = report.iterations,
            second_firings = report.second_firings,
            total_calls = report.total_calls,
            failed_calls = report.failed_calls,
            "Run finished"
        );
        self.emit(RunEvent::RunFinished {
            run_id,
            stage: final_stage,
            iterations: report.iterations,
            second_firings: report.second_firings,
        });

        Ok(report)
    }

    async fn main_loop(&self, run: &mut Run<'_>) {
        while run.state.iteration_count < run.params.main_iterations {
            if run.state.should_exit(Instant::now()) {
                break;
            }

            run.state.iteration_count += 1;
            let iteration = run.state.iteration_count;
            info!(iteration, "Outer iteration started");
            self.emit(RunEvent::IterationStarted {
                run_id: run.state.run_id,
                iteration,
            });
            self.report(run, JobStatus::Running, &format!("Iteration {} START", iteration))
                .await;

            self.run_batch(run, Phase::Start).await;
            self.inner_loop(run).await;
            self.run_batch(run, Phase::End).await;

            if run.state.should_exit(Instant::now()) {
                debug!(iteration, "Leaving main loop after END batch");
                break;
            }
        }
    }

    async fn inner_loop(&self, run: &mut Run<'_>) {
        run.throttle.reset();
        let deadline = offset(Instant::now(), run.params.main_window()).min(run.state.end_time);

        loop {
            let now = Instant::now();
            if now >= deadline || run.state.should_exit(now) {
                break;
            }

            let catalog = run.catalog;
            for descriptor in catalog.lookup(Phase::Inner) {
                let key = descriptor.key();
                if !run.throttle.eligible(&key, now, descriptor.interval) {
                    continue;
                }
                run.throttle.mark_run(key, now);
                let results = run.executor.execute(Phase::Inner, descriptor).await;
                self.record_results(run, Phase::Inner, &descriptor.qualified_name(), results)
                    .await;
            }

            let now = Instant::now();
            if run.state.second_due(&run.params, now) {
                let firing = run
                    .state
                    .record_second_firing(run.params.second_cadence(), now);
                info!(firing, of = run.params.second_iterations, "Second cadence fired");
                self.emit(RunEvent::SecondCadenceFired {
                    run_id: run.state.run_id,
                    firing,
                });
                self.run_batch(run, Phase::SecondEnd).await;
            }

            if run
                .state
                .heartbeat_due(Instant::now(), self.config.heartbeat_interval)
            {
                self.report(run, JobStatus::Running, "Heart beat").await;
            }

            let wake = offset(Instant::now(), self.config.poll_interval).min(deadline);
            sleep_until(wake).await;
        }
    }

    async fn run_batch(&self, run: &mut Run<'_>, phase: Phase) {
        let catalog = run.catalog;
        let descriptors = catalog.lookup(phase);
        if descriptors.is_empty() {
            return;
        }
        debug!(phase = %phase, procedures = descriptors.len(), "Running batch");

        for descriptor in descriptors {
            let results = run.executor.execute(phase, descriptor).await;
            self.record_results(run, phase, &descriptor.qualified_name(), results)
                .await;
        }
    }

    async fn record_results(
        &self,
        run: &mut Run<'_>,
        phase: Phase,
        procedure: &str,
        results: Vec<CallResult>,
    ) {
        for result in results {
            run.stats.total += 1;
            if !result.outcome.is_success() {
                run.stats.failed += 1;
            }

            self.write_record(&result.record).await;
            self.emit(RunEvent::ProcedureCompleted {
                run_id: run.state.run_id,
                phase,
                procedure: procedure.to_string(),
                parameter: result.record.parameter.clone(),
                value: result.record.value,
                success: result.outcome.is_success(),
                elapsed_ms: result.elapsed.as_millis() as u64,
            });
        }
    }

    /// Push a status and pull the stop signal. A failed exchange is
    /// recorded and the previous stop value kept.
    async fn report(&self, run: &mut Run<'_>, status: JobStatus, detail: &str) {
        run.state.mark_heartbeat(Instant::now());

        let (delivered, should_stop) = match self
            .control
            .report_status(&run.ctx.test_id, &run.ctx.identity, status, detail)
            .await
        {
            Ok(stop) => {
                if stop && !run.state.should_stop {
                    info!(detail = %detail, "Control plane requested stop");
                }
                run.state.observe_stop(stop);
                (true, run.state.should_stop)
            }
            Err(e) => {
                warn!(status = %status.as_str(), detail = %detail, error = %e, "Status report failed");
                self.write_record(&ResultRecord::control_plane_error(&e.to_string()))
                    .await;
                (false, run.state.should_stop)
            }
        };

        self.emit(RunEvent::StatusReported {
            run_id: run.state.run_id,
            status,
            detail: detail.to_string(),
            delivered,
            should_stop,
        });
    }

    async fn write_record(&self, record: &ResultRecord) {
        if let Err(e) = self.sink.append(record).await {
            error!(error = %e, line = %record.to_log_line(), "Failed to write result record");
        }
    }

    fn advance(&self, run: &mut Run<'_>, to: RunStage) -> Result<()> {
        let from = run.state.transition(to)?;
        debug!(from = %from.as_str(), to = %to.as_str(), "Stage changed");
        self.emit(RunEvent::StageChanged {
            run_id: run.state.run_id,
            from,
            to,
        });
        Ok(())
    }

    fn emit(&self, event: RunEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}
