use chrono::{DateTime, Utc};
use loadrig_core::{JobStatus, Phase, RunStage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope carrying one event with its id and publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: RunEvent,
}

impl EventEnvelope {
    pub fn new(event: RunEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    #[serde(rename = "run.started")]
    RunStarted {
        run_id: Uuid,
        test_id: String,
        role: String,
        identity: String,
    },

    #[serde(rename = "run.stage_changed")]
    StageChanged {
        run_id: Uuid,
        from: RunStage,
        to: RunStage,
    },

    /// An outer iteration began (1-based)
    #[serde(rename = "run.iteration_started")]
    IterationStarted { run_id: Uuid, iteration: u32 },

    /// The second cadence fired (1-based)
    #[serde(rename = "run.second_cadence_fired")]
    SecondCadenceFired { run_id: Uuid, firing: u32 },

    #[serde(rename = "procedure.completed")]
    ProcedureCompleted {
        run_id: Uuid,
        phase: Phase,
        procedure: String,
        parameter: String,
        value: i64,
        success: bool,
        elapsed_ms: u64,
    },

    /// A status report went out; `delivered` is false when the control
    /// plane could not be reached.
    #[serde(rename = "status.reported")]
    StatusReported {
        run_id: Uuid,
        status: JobStatus,
        detail: String,
        delivered: bool,
        should_stop: bool,
    },

    #[serde(rename = "run.finished")]
    RunFinished {
        run_id: Uuid,
        stage: RunStage,
        iterations: u32,
        second_firings: u32,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StageChanged { run_id, .. }
            | Self::IterationStarted { run_id, .. }
            | Self::SecondCadenceFired { run_id, .. }
            | Self::ProcedureCompleted { run_id, .. }
            | Self::StatusReported { run_id, .. }
            | Self::RunFinished { run_id, .. } => *run_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. })
    }
}
