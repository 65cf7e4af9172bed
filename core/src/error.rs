//! Error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the monitoring API dispatcher
///
/// Authentication failures are terminal and never retried. Everything the
/// dispatcher cannot classify ends up as [`DispatchError::Unknown`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("All endpoints unavailable (tried: {})", attempted.join(", "))]
    AllEndpointsUnavailable { attempted: Vec<String> },

    #[error("Transient upstream error: {0}")]
    TransientUpstream(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DispatchError {
    /// Whether the calling script should halt rather than continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Kill switch engaged: {0}")]
    KillSwitchEngaged(String),

    #[error("SMS error: {0}")]
    SmsError(String),

    #[error("Ticket error: {0}")]
    TicketError(String),

    #[error("Sender error: {0}")]
    SenderError(String),

    #[error("Command error: {0}")]
    CommandError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Other error: {0}")]
    Other(String),
}

// Convert anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
