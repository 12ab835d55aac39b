use serde::{Deserialize, Serialize};
use std::fmt;

/// A live session on the workload host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSession {
    pub id: String,
    pub target: String,
}

/// One procedure call as the host sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invocation {
    pub module: String,
    pub procedure: String,
    pub parameter: String,
}

impl Invocation {
    pub fn new(
        module: impl Into<String>,
        procedure: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            procedure: procedure.into(),
            parameter: parameter.into(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.procedure)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenSessionRequest {
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSessionResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvokeResponse {
    pub value: f64,
}
