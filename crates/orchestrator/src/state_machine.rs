use loadrig_core::RunStage;

use crate::error::{OrchestratorError, Result};

pub struct RunStateMachine;

impl RunStateMachine {
    pub fn validate_transition(from: &RunStage, to: &RunStage) -> Result<()> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// `Aborted` is reachable from every non-terminal stage. `MainLoop` may be
    /// skipped when a stop is already pending after the pre-start batch.
    fn allowed_transitions(from: &RunStage) -> Vec<RunStage> {
        match from {
            RunStage::Init => vec![RunStage::PreStartOnce, RunStage::Aborted],
            RunStage::PreStartOnce => vec![
                RunStage::MainLoop,
                RunStage::PostCloseOnce,
                RunStage::Aborted,
            ],
            RunStage::MainLoop => vec![RunStage::PostCloseOnce, RunStage::Aborted],
            RunStage::PostCloseOnce => vec![RunStage::Completed, RunStage::Aborted],
            RunStage::Completed | RunStage::Aborted => vec![],
        }
    }
}
