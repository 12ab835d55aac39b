use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::phase::Phase;
use crate::error::{CoreError, Result};

/// A callable unit on the workload host plus its invocation policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcedureDescriptor {
    pub module: String,
    pub procedure: String,
    pub parameter: String,
    /// Minimum re-fire interval, only honoured in the inner phase
    pub interval: Duration,
    /// Back-to-back invocations per cycle, always at least 1
    pub throughput: u32,
    /// Deadline for a single invocation, always non-zero
    pub timeout: Duration,
}

impl ProcedureDescriptor {
    pub fn new(
        module: impl Into<String>,
        procedure: impl Into<String>,
        parameter: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            module: module.into(),
            procedure: procedure.into(),
            parameter: parameter.into(),
            interval: Duration::ZERO,
            throughput: 1,
            timeout,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_throughput(mut self, throughput: u32) -> Self {
        self.throughput = throughput.max(1);
        self
    }

    /// `Module.Procedure`, the name the host resolves.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.procedure)
    }

    pub fn key(&self) -> ProcedureKey {
        ProcedureKey {
            module: self.module.clone(),
            procedure: self.procedure.clone(),
            parameter: self.parameter.clone(),
        }
    }
}

/// Identity of a procedure for repeat-interval bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcedureKey {
    pub module: String,
    pub procedure: String,
    pub parameter: String,
}

impl fmt::Display for ProcedureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(\"{}\")", self.module, self.procedure, self.parameter)
    }
}

/// One raw row of the procedure catalog as stored by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub phase: String,
    pub module: String,
    pub procedure: String,
    pub parameter: String,
    pub interval_secs: i64,
    pub throughput: i64,
    pub timeout_secs: i64,
    pub sequence: i64,
    pub role: String,
}

impl CatalogEntry {
    /// Whether this row applies to a run executing as `run_role`.
    ///
    /// A row matches on the exact role or on the role's first character,
    /// which is how role families share a catalog.
    pub fn applies_to(&self, run_role: &str) -> bool {
        if self.role == run_role {
            return true;
        }
        let mut chars = run_role.chars();
        match (chars.next(), self.role.chars().count()) {
            (Some(first), 1) => self.role.starts_with(first),
            _ => false,
        }
    }

    /// Validate the row and turn it into a phase-tagged descriptor.
    ///
    /// Non-positive timeouts fall back to `default_timeout`, throughput is
    /// clamped to at least 1 and negative intervals are treated as zero.
    pub fn into_descriptor(self, default_timeout: Duration) -> Result<(Phase, ProcedureDescriptor)> {
        let phase: Phase = self.phase.parse()?;

        if self.module.trim().is_empty() || self.procedure.trim().is_empty() {
            return Err(CoreError::InvalidCatalogEntry {
                procedure: format!("{}.{}", self.module, self.procedure),
                reason: "module and procedure names must not be empty".to_string(),
            });
        }

        let timeout = if self.timeout_secs > 0 {
            Duration::from_secs(self.timeout_secs as u64)
        } else {
            default_timeout
        };
        let interval = Duration::from_secs(self.interval_secs.max(0) as u64);
        let throughput = u32::try_from(self.throughput.max(1)).unwrap_or(u32::MAX);

        let descriptor = ProcedureDescriptor::new(self.module, self.procedure, self.parameter, timeout)
            .with_interval(interval)
            .with_throughput(throughput);

        Ok((phase, descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(phase: &str, role: &str) -> CatalogEntry {
        CatalogEntry {
            phase: phase.to_string(),
            module: "Orders".to_string(),
            procedure: "Submit".to_string(),
            parameter: "A-100".to_string(),
            interval_secs: 5,
            throughput: 2,
            timeout_secs: 10,
            sequence: 1,
            role: role.to_string(),
        }
    }

    #[test]
    fn test_role_matching() {
        assert!(entry("INNER", "T1").applies_to("T1"));
        assert!(entry("INNER", "T").applies_to("T1"));
        assert!(!entry("INNER", "T2").applies_to("T1"));
        assert!(!entry("INNER", "X").applies_to("T1"));
        assert!(!entry("INNER", "T1").applies_to("T"));
        assert!(!entry("INNER", "T").applies_to(""));
    }

    #[test]
    fn test_into_descriptor() {
        let (phase, descriptor) = entry("INNER", "T1")
            .into_descriptor(Duration::from_secs(30))
            .unwrap();

        assert_eq!(phase, Phase::Inner);
        assert_eq!(descriptor.qualified_name(), "Orders.Submit");
        assert_eq!(descriptor.interval, Duration::from_secs(5));
        assert_eq!(descriptor.throughput, 2);
        assert_eq!(descriptor.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_policy_values_fall_back() {
        let mut raw = entry("START", "T1");
        raw.timeout_secs = 0;
        raw.throughput = 0;
        raw.interval_secs = -3;

        let (_, descriptor) = raw.into_descriptor(Duration::from_secs(30)).unwrap();
        assert_eq!(descriptor.timeout, Duration::from_secs(30));
        assert_eq!(descriptor.throughput, 1);
        assert_eq!(descriptor.interval, Duration::ZERO);
    }

    #[test]
    fn test_unknown_phase_fails_validation() {
        let err = entry("WARMUP", "T1")
            .into_descriptor(Duration::from_secs(30))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownPhase(_)));
    }

    #[test]
    fn test_empty_names_fail_validation() {
        let mut raw = entry("END", "T1");
        raw.procedure = "  ".to_string();
        let err = raw.into_descriptor(Duration::from_secs(30)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCatalogEntry { .. }));
    }

    #[test]
    fn test_key_display() {
        let descriptor = ProcedureDescriptor::new("Orders", "Submit", "A-100", Duration::from_secs(1));
        assert_eq!(descriptor.key().to_string(), "Orders.Submit(\"A-100\")");
    }
}
