pub mod catalog;
pub mod control;
pub mod error;
pub mod executor;
pub mod result_log;
pub mod run_state;
pub mod scheduler;
pub mod state_machine;
pub mod throttle;

pub use catalog::ProcedureCatalog;
pub use control::{ControlPlane, SqlControlPlane};
pub use error::{OrchestratorError, Result};
pub use executor::{CallResult, ExecutorConfig, FunctionExecutor};
pub use result_log::{FileResultLog, ResultLogPolicy, ResultSink};
pub use run_state::RunState;
pub use scheduler::{Orchestrator, OrchestratorConfig, RunContext, RunReport};
pub use state_machine::RunStateMachine;
pub use throttle::IntervalThrottle;
