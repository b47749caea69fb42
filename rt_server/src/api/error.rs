//! Mapping of engine errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use robo_tournament::TournamentError;
use serde::Serialize;

use crate::metrics;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Status code for an engine error
///
/// Missing entities are 404, state conflicts 409, other precondition
/// failures 422. Storage failures are 500, or 503 when they timed out.
pub fn status_for(error: &TournamentError) -> StatusCode {
    match error {
        TournamentError::TeamNotFound(_)
        | TournamentError::GroupNotFound(_)
        | TournamentError::MatchNotFound(_)
        | TournamentError::NoGroupsFound(_) => StatusCode::NOT_FOUND,

        TournamentError::GroupAlreadyCompleted(_)
        | TournamentError::MatchAlreadyResolved(_)
        | TournamentError::TeamInUse(_) => StatusCode::CONFLICT,

        TournamentError::InsufficientContestants { .. }
        | TournamentError::InvalidWinner { .. }
        | TournamentError::NotAMember { .. }
        | TournamentError::InvalidMatch(_)
        | TournamentError::InvalidGroupSize(_) => StatusCode::UNPROCESSABLE_ENTITY,

        TournamentError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        TournamentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert an engine error into a sanitized JSON error response
pub fn api_error(error: TournamentError) -> ApiError {
    let status = status_for(&error);

    if error.is_precondition() {
        tracing::debug!(error = %error, "Request rejected");
        metrics::tournament_errors_total("precondition");
    } else {
        tracing::error!(error = %error, "Storage failure");
        metrics::tournament_errors_total("storage");
    }

    (
        status,
        Json(ErrorResponse {
            error: error.client_message(),
        }),
    )
}

/// 422 for a request body that parsed but makes no sense
pub fn invalid_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
