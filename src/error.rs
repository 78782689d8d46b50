//! Error types for the matchmaking service
//!
//! Core operations return [`MatchmakingError`]; bootstrap and configuration
//! code uses anyhow like the rest of the service shell.

/// Result type alias for core matchmaking operations
pub type Result<T, E = MatchmakingError> = std::result::Result<T, E>;

/// Broad category of a matchmaking failure, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Forbidden,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Bad request: {reason}")]
    BadRequest { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchmakingError::TicketNotFound { .. } | MatchmakingError::MatchNotFound { .. } => {
                ErrorKind::NotFound
            }
            MatchmakingError::BadRequest { .. } => ErrorKind::BadRequest,
            MatchmakingError::Forbidden { .. } => ErrorKind::Forbidden,
            MatchmakingError::Conflict { .. } => ErrorKind::Conflict,
            MatchmakingError::ConfigurationError { .. } | MatchmakingError::InternalError { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Error for a poisoned lock guarding shared matchmaking state
    pub(crate) fn lock_failed(what: &str) -> Self {
        MatchmakingError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}
