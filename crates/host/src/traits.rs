use async_trait::async_trait;

use crate::error::Result;
use crate::types::{HostSession, Invocation};

/// An automatable application holding one stateful session per agent.
///
/// Calls have no native cancellation: when a caller gives up on `invoke`,
/// the host may keep running the procedure.
#[async_trait]
pub trait WorkloadHost: Send + Sync {
    async fn open(&self, target: &str) -> Result<HostSession>;

    /// Run `Module.Procedure(parameter)` and return its numeric result.
    ///
    /// Returns `HostError::SessionLost` when the session no longer exists.
    async fn invoke(&self, session: &HostSession, call: &Invocation) -> Result<f64>;

    async fn close(&self, session: &HostSession) -> Result<()>;
}
