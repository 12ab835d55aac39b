use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Invalid catalog entry {procedure}: {reason}")]
    InvalidCatalogEntry { procedure: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
