use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing parameters of one test run, loaded once before the run starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunParameters {
    /// Length of one outer iteration's inner loop
    pub main_duration_minutes: u32,
    /// Upper bound on outer iterations
    pub main_iterations: u32,
    /// Cadence of the second-tier event inside the inner loop
    pub second_duration_minutes: u32,
    /// Upper bound on second-tier firings over the whole run
    pub second_iterations: u32,
    /// Delay before the test window starts
    pub wait_before_start_seconds: u32,
}

impl RunParameters {
    pub fn main_window(&self) -> Duration {
        minutes(self.main_duration_minutes)
    }

    /// The whole test window: `main_duration × main_iterations`, saturating.
    pub fn total_window(&self) -> Duration {
        minutes(self.main_duration_minutes).saturating_mul(self.main_iterations)
    }

    pub fn second_cadence(&self) -> Duration {
        minutes(self.second_duration_minutes)
    }

    /// When the last second-tier firing is planned, relative to the start.
    pub fn second_window(&self) -> Duration {
        minutes(self.second_duration_minutes).saturating_mul(self.second_iterations)
    }

    pub fn wait_before_start(&self) -> Duration {
        Duration::from_secs(u64::from(self.wait_before_start_seconds))
    }
}

fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}

/// Lifecycle of a run as driven by the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    #[default]
    Init,
    PreStartOnce,
    MainLoop,
    PostCloseOnce,
    Completed,
    Aborted,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PreStartOnce => "pre_start_once",
            Self::MainLoop => "main_loop",
            Self::PostCloseOnce => "post_close_once",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

/// Status an agent pushes to the control plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Aborted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
        }
    }
}
