use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    /// The session is gone; a new one must be opened before retrying.
    #[error("Session lost: {0}")]
    SessionLost(String),

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The procedure itself raised an error inside the host.
    #[error("Call failed: {0}")]
    Call(String),
}

impl HostError {
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
