//! Mapping of matchmaking failures onto HTTP responses
//!
//! Every error body is `{"code": "...", "message": "..."}`. Internal details
//! are logged, never returned.

use crate::error::{ErrorKind, MatchmakingError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. "NOT_FOUND"
    pub code: String,
    pub message: String,
}

/// Handler error; wraps a [`MatchmakingError`]
#[derive(Debug)]
pub struct ApiError(pub MatchmakingError);

impl From<MatchmakingError> for ApiError {
    fn from(err: MatchmakingError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.0.kind() {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::BadRequest => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            MatchmakingError::TicketNotFound { .. } => "Ticket not found".to_string(),
            MatchmakingError::MatchNotFound { .. } => "Match not found".to_string(),
            MatchmakingError::BadRequest { reason }
            | MatchmakingError::Forbidden { reason }
            | MatchmakingError::Conflict { reason } => reason.clone(),
            MatchmakingError::ConfigurationError { .. }
            | MatchmakingError::InternalError { .. } => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "internal server error");
        }

        let body = ErrorBody {
            code: code.to_string(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}
