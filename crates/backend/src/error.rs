use thiserror::Error;

/// Failures of the persistence, auth and storage collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures of the mail relay.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}
