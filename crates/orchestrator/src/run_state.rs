use loadrig_core::{RunParameters, RunStage};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::Result;
use crate::state_machine::RunStateMachine;

/// Mutable bookkeeping of one run. Owned by the orchestrator alone.
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: Uuid,
    pub stage: RunStage,
    pub iteration_count: u32,
    pub second_iteration_count: u32,
    pub second_next_run_at: Instant,
    /// Sticky: once set it stays set
    pub should_stop: bool,
    pub start_time: Instant,
    pub end_time: Instant,
    pub last_heartbeat: Instant,
}

impl RunState {
    pub fn new(params: &RunParameters, start_time: Instant) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: RunStage::Init,
            iteration_count: 0,
            second_iteration_count: 0,
            second_next_run_at: offset(start_time, params.second_cadence()),
            should_stop: false,
            start_time,
            end_time: offset(start_time, params.total_window()),
            last_heartbeat: start_time,
        }
    }

    /// Move to `to`, returning the stage that was left.
    pub fn transition(&mut self, to: RunStage) -> Result<RunStage> {
        RunStateMachine::validate_transition(&self.stage, &to)?;
        let from = self.stage;
        self.stage = to;
        Ok(from)
    }

    pub fn observe_stop(&mut self, stop: bool) {
        self.should_stop |= stop;
    }

    /// Checkpoint test: stop was signalled or the test window is over.
    pub fn should_exit(&self, now: Instant) -> bool {
        self.should_stop || now >= self.end_time
    }

    pub fn second_due(&self, params: &RunParameters, now: Instant) -> bool {
        self.second_iteration_count < params.second_iterations && now >= self.second_next_run_at
    }

    /// Count a second-cadence firing at `now` and schedule the next one a
    /// full cadence later. Returns the 1-based firing number.
    ///
    /// The next slot is measured from the actual firing, not from the
    /// planned one, so a late tick never triggers back-to-back firings.
    pub fn record_second_firing(&mut self, cadence: Duration, now: Instant) -> u32 {
        self.second_iteration_count += 1;
        self.second_next_run_at = offset(now, cadence);
        self.second_iteration_count
    }

    pub fn heartbeat_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) >= interval
    }

    pub fn mark_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = now;
    }

    pub fn final_stage(&self) -> RunStage {
        if self.should_stop {
            RunStage::Aborted
        } else {
            RunStage::Completed
        }
    }
}

/// Farthest a run window may reach past its start.
const MAX_WINDOW: Duration = Duration::from_secs(u32::MAX as u64 * 60);

/// `start + window`, clamped so oversized control-plane values cannot
/// overflow the clock.
pub(crate) fn offset(start: Instant, window: Duration) -> Instant {
    start
        .checked_add(window.min(MAX_WINDOW))
        .unwrap_or(start)
}
