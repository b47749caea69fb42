//! Match API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use robo_tournament::tournament::{Match, MatchFilter, MatchId, NewMatch, TeamId};
use serde::Deserialize;

use super::{
    AppState,
    error::{ApiResult, api_error, invalid_request},
};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub winner_id: TeamId,
}

/// List matches ordered by round, then match number.
///
/// # Query Parameters
///
/// - `category_id`, `division_id`, `group_id`, `stage_number`, `team_id`
/// - `status`: `pending` or `completed`
pub async fn list_matches(
    State(state): State<AppState>,
    Query(filter): Query<MatchFilter>,
) -> ApiResult<Json<Vec<Match>>> {
    state
        .manager
        .list_matches(&filter)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Schedule a match outside of group play.
///
/// # Errors
///
/// - `404 Not Found`: Either team doesn't exist
/// - `422 Unprocessable Entity`: Non-positive round/match number or a team
///   paired with itself
pub async fn create_match(
    State(state): State<AppState>,
    Json(request): Json<NewMatch>,
) -> ApiResult<(StatusCode, Json<Match>)> {
    if request.round_number < 1 || request.match_number < 1 {
        return Err(invalid_request(
            "round_number and match_number must be at least 1",
        ));
    }

    let created = state
        .manager
        .create_match(request)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<Match>> {
    state
        .manager
        .get_match(match_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Record the winner of a pending match.
///
/// # Request Body
///
/// ```json
/// { "winner_id": "6f1c..." }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: A result was already recorded
/// - `422 Unprocessable Entity`: Winner does not play in this match
pub async fn record_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<RecordResultRequest>,
) -> ApiResult<Json<Match>> {
    let resolved = state
        .manager
        .record_match_result(match_id, request.winner_id)
        .await
        .map_err(api_error)?;

    metrics::match_results_total();
    Ok(Json(resolved))
}
