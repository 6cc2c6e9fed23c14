//! Error taxonomy shared across the workspace.
//!
//! Every engine operation fails synchronously with one of these kinds; the
//! HTTP layer (an external collaborator) maps them to response codes via
//! [`ShepherdError::status_code`]. Nothing is retried internally.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShepherdError>;

#[derive(Debug, Error)]
pub enum ShepherdError {
    /// An id-based lookup did not resolve to a live record.
    #[error("{0}")]
    NotFound(String),

    /// Malformed or policy-violating input (e.g. assignee without the
    /// Follow-Up Team role).
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation at creation (e.g. duplicate cell name).
    #[error("{0}")]
    Conflict(String),

    /// Persistence gateway failure.
    #[error("store: {0}")]
    Store(String),

    /// Notification channel failure.
    #[error("channel: {0}")]
    Channel(String),

    /// Configuration load/parse failure.
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShepherdError {
    /// Status classification for the HTTP collaborator.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ShepherdError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ShepherdError::Validation("x".into()).status_code(), 400);
        assert_eq!(ShepherdError::Conflict("x".into()).status_code(), 409);
        assert_eq!(ShepherdError::Store("x".into()).status_code(), 500);
    }
}
