use loadrig_core::ProcedureKey;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Last-run clock per inner-phase procedure.
#[derive(Debug, Default)]
pub struct IntervalThrottle {
    last_run: HashMap<ProcedureKey, Instant>,
}

impl IntervalThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `key` never ran since the last reset or at least
    /// `interval` has passed since it did.
    pub fn eligible(&self, key: &ProcedureKey, now: Instant, interval: Duration) -> bool {
        match self.last_run.get(key) {
            Some(last) => now.saturating_duration_since(*last) >= interval,
            None => true,
        }
    }

    pub fn mark_run(&mut self, key: ProcedureKey, now: Instant) {
        self.last_run.insert(key, now);
    }

    /// Forget every last-run time.
    pub fn reset(&mut self) {
        self.last_run.clear();
    }
}
