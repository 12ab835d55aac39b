use host::{HostSession, Invocation, WorkloadHost};
use loadrig_core::{Outcome, Phase, ProcedureDescriptor, ResultRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Pause before every invocation, emulating a person at the keyboard
    pub think_time: Duration,
    /// Deadline for procedures whose catalog row carries none
    pub default_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            think_time: Duration::ZERO,
            default_timeout: Duration::from_secs(60),
        }
    }
}

impl ExecutorConfig {
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// One invocation and what it produced.
#[derive(Debug, Clone)]
pub struct CallResult {
    pub outcome: Outcome,
    pub record: ResultRecord,
    pub elapsed: Duration,
}

enum Attempt {
    Done(Outcome),
    SessionLost(String),
}

/// Invokes procedures on the workload host, one at a time, under a deadline.
///
/// Every failure is turned into an [`Outcome`]; nothing escapes `execute`.
///
/// The deadline is best effort. Each call runs in its own task which is
/// aborted when the deadline passes, so an async adapter stops at its next
/// await point. Whatever the host already started keeps running there.
pub struct FunctionExecutor {
    host: Arc<dyn WorkloadHost>,
    target: String,
    session: Option<HostSession>,
    config: ExecutorConfig,
}

impl FunctionExecutor {
    pub fn new(host: Arc<dyn WorkloadHost>, target: impl Into<String>, config: ExecutorConfig) -> Self {
        Self {
            host,
            target: target.into(),
            session: None,
            config,
        }
    }

    /// Open the initial session.
    pub async fn open(&mut self) -> host::Result<()> {
        let session = self.host.open(&self.target).await?;
        info!(session_id = %session.id, target = %self.target, "Host session opened");
        self.session = Some(session);
        Ok(())
    }

    /// Drop the current session, if any, and open a fresh one.
    pub async fn reconnect(&mut self) -> host::Result<HostSession> {
        if let Some(old) = self.session.take() {
            if let Err(e) = self.host.close(&old).await {
                debug!(session_id = %old.id, error = %e, "Closing stale session failed");
            }
        }

        let session = self.host.open(&self.target).await?;
        info!(session_id = %session.id, "Host session reopened");
        self.session = Some(session.clone());
        Ok(session)
    }

    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            match self.host.close(&session).await {
                Ok(()) => info!(session_id = %session.id, "Host session closed"),
                Err(e) => warn!(session_id = %session.id, error = %e, "Failed to close host session"),
            }
        }
    }

    /// Think once, then run `descriptor` `throughput` times back to back.
    pub async fn execute(&mut self, phase: Phase, descriptor: &ProcedureDescriptor) -> Vec<CallResult> {
        let mut results = Vec::with_capacity(descriptor.throughput.max(1) as usize);

        if !self.config.think_time.is_zero() {
            tokio::time::sleep(self.config.think_time).await;
        }

        for _ in 0..descriptor.throughput.max(1) {
            let started = Instant::now();
            let outcome = self.execute_once(descriptor).await;
            let elapsed = started.elapsed();

            match &outcome {
                Outcome::Success(value) => debug!(
                    phase = %phase,
                    procedure = %descriptor.qualified_name(),
                    parameter = %descriptor.parameter,
                    value,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Procedure succeeded"
                ),
                Outcome::Timeout(after) => warn!(
                    phase = %phase,
                    procedure = %descriptor.qualified_name(),
                    parameter = %descriptor.parameter,
                    timeout_secs = after.as_secs(),
                    "Procedure timed out"
                ),
                Outcome::Error(message) => warn!(
                    phase = %phase,
                    procedure = %descriptor.qualified_name(),
                    parameter = %descriptor.parameter,
                    error = %message,
                    "Procedure failed"
                ),
            }

            let record = ResultRecord::from_outcome(phase, &descriptor.parameter, &outcome);
            results.push(CallResult {
                outcome,
                record,
                elapsed,
            });
        }

        results
    }

    /// Invoke under the descriptor's deadline, and on a lost session
    /// reconnect and retry the same call once.
    pub async fn execute_once(&mut self, descriptor: &ProcedureDescriptor) -> Outcome {
        let call = Invocation::new(
            descriptor.module.as_str(),
            descriptor.procedure.as_str(),
            descriptor.parameter.as_str(),
        );
        let timeout = if descriptor.timeout.is_zero() {
            self.config.default_timeout
        } else {
            descriptor.timeout
        };

        match self.attempt(&call, timeout).await {
            Attempt::Done(outcome) => outcome,
            Attempt::SessionLost(reason) => {
                warn!(procedure = %call, reason = %reason, "Host session lost, reconnecting");
                if let Err(e) = self.reconnect().await {
                    return Outcome::Error(format!("session lost and reconnect failed: {}", e));
                }
                match self.attempt(&call, timeout).await {
                    Attempt::Done(outcome) => outcome,
                    Attempt::SessionLost(reason) => {
                        Outcome::Error(format!("session lost again after reconnect: {}", reason))
                    }
                }
            }
        }
    }

    async fn attempt(&mut self, call: &Invocation, timeout: Duration) -> Attempt {
        let session = match self.session.clone() {
            Some(session) => session,
            None => match self.reconnect().await {
                Ok(session) => session,
                Err(e) => return Attempt::Done(Outcome::Error(format!("no host session: {}", e))),
            },
        };

        let host = Arc::clone(&self.host);
        let owned = call.clone();
        let mut handle = tokio::spawn(async move { host.invoke(&session, &owned).await });

        match tokio::time::timeout(timeout, &mut handle).await {
            Err(_) => {
                handle.abort();
                Attempt::Done(Outcome::Timeout(timeout))
            }
            Ok(Err(join_error)) => Attempt::Done(Outcome::Error(format!("call aborted: {}", join_error))),
            Ok(Ok(Err(e))) if e.is_session_lost() => {
                self.session = None;
                Attempt::SessionLost(e.to_string())
            }
            Ok(Ok(Err(e))) => Attempt::Done(Outcome::Error(e.to_string())),
            Ok(Ok(Ok(value))) => Attempt::Done(classify(value)),
        }
    }
}

/// Successful results are finite and non-negative; anything else would
/// collide with the failure sentinel.
fn classify(value: f64) -> Outcome {
    if value.is_finite() && value >= 0.0 {
        Outcome::Success(value)
    } else {
        Outcome::Error(format!("invalid result value {}", value))
    }
}
