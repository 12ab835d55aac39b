use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Missing inputs, unreadable run parameters or an unusable catalog.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The workload host could not be reached when the run started.
    #[error("Workload host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Errors that end the process instead of being recorded and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::HostUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
