use loadrig_core::{CatalogEntry, Phase, ProcedureDescriptor};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::control::ControlPlane;
use crate::error::{OrchestratorError, Result};

/// Procedures of one run, partitioned by phase.
///
/// Built once before the run and never modified. Within a phase the
/// descriptors keep the order in which they were loaded, which is also the
/// order they execute in.
#[derive(Debug, Clone, Default)]
pub struct ProcedureCatalog {
    phases: HashMap<Phase, Vec<ProcedureDescriptor>>,
}

impl ProcedureCatalog {
    /// Load the catalog for `role` from the control plane.
    ///
    /// Failing to read the catalog or finding an invalid row is fatal.
    pub async fn load(control: &dyn ControlPlane, role: &str, default_timeout: Duration) -> Result<Self> {
        let entries = control.load_catalog(role).await.map_err(|e| {
            OrchestratorError::configuration(format!("cannot load catalog for role {}: {}", role, e))
        })?;

        let catalog = Self::from_entries(entries, role, default_timeout)?;
        info!(
            role = %role,
            procedures = catalog.len(),
            "Procedure catalog loaded"
        );
        Ok(catalog)
    }

    /// Partition `entries` by phase, keeping only rows that apply to `role`.
    pub fn from_entries(
        entries: impl IntoIterator<Item = CatalogEntry>,
        role: &str,
        default_timeout: Duration,
    ) -> Result<Self> {
        let mut phases: HashMap<Phase, Vec<ProcedureDescriptor>> = HashMap::new();

        for entry in entries {
            if !entry.applies_to(role) {
                continue;
            }
            let (phase, descriptor) = entry
                .into_descriptor(default_timeout)
                .map_err(|e| OrchestratorError::configuration(format!("invalid catalog entry: {}", e)))?;

            debug!(phase = %phase, procedure = %descriptor.qualified_name(), "Catalog entry");
            phases.entry(phase).or_default().push(descriptor);
        }

        Ok(Self { phases })
    }

    /// Descriptors of `phase` in load order; empty when the phase has none.
    pub fn lookup(&self, phase: Phase) -> &[ProcedureDescriptor] {
        self.phases.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.phases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
