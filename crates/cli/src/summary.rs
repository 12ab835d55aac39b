use events::RunEvent;
use loadrig_core::Phase;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTally {
    pub calls: u64,
    pub failures: u64,
}

/// Per-phase call counts gathered from run events.
#[derive(Debug, Default)]
pub struct RunSummary {
    phases: BTreeMap<Phase, PhaseTally>,
    status_failures: u64,
}

impl RunSummary {
    pub fn observe(&mut self, event: &RunEvent) {
        match event {
            RunEvent::ProcedureCompleted { phase, success, .. } => {
                let tally = self.phases.entry(*phase).or_default();
                tally.calls += 1;
                if !success {
                    tally.failures += 1;
                }
            }
            RunEvent::StatusReported { delivered: false, .. } => self.status_failures += 1,
            _ => {}
        }
    }

    pub fn tally(&self, phase: Phase) -> PhaseTally {
        self.phases.get(&phase).copied().unwrap_or_default()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<12} {:>8} {:>8}", "PHASE", "CALLS", "FAILED");
        for phase in Phase::ALL {
            let tally = self.tally(phase);
            let _ = writeln!(out, "{:<12} {:>8} {:>8}", phase.as_str(), tally.calls, tally.failures);
        }
        if self.status_failures > 0 {
            let _ = writeln!(out, "Status reports not delivered: {}", self.status_failures);
        }
        out
    }
}
