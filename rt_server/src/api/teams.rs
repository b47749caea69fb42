//! Team management API handlers.
//!
//! Teams register into a bracket (category and division) and keep their
//! wins, losses and eliminated flag across every stage of that bracket.
//!
//! # Examples
//!
//! Register a team:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/teams \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Sparky", "category_id": 1, "division_id": 2, "robot_name": "Sparky Mk II"}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use robo_tournament::tournament::{Match, NewTeam, Team, TeamFilter, TeamId, TeamUpdate};

use super::{
    AppState,
    error::{ApiResult, api_error, invalid_request},
};

/// List teams, most wins first.
///
/// # Query Parameters
///
/// - `category_id`, `division_id`: restrict to a bracket
/// - `eliminated`: `true` or `false` to filter on the eliminated flag
pub async fn list_teams(
    State(state): State<AppState>,
    Query(filter): Query<TeamFilter>,
) -> ApiResult<Json<Vec<Team>>> {
    state
        .manager
        .list_teams(&filter)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Register a new team.
///
/// # Response
///
/// Returns `201 Created` with the stored team.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Blank team name
pub async fn create_team(
    State(state): State<AppState>,
    Json(mut request): Json<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    request.name = request.name.trim().to_string();
    if request.name.is_empty() {
        return Err(invalid_request("Team name must not be blank"));
    }

    let team = state
        .manager
        .register_team(request)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<TeamId>,
) -> ApiResult<Json<Team>> {
    state
        .manager
        .get_team(team_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Edit a team's name, robot details or qualified flag.
///
/// Omitted fields are left unchanged.
pub async fn update_team(
    State(state): State<AppState>,
    Path(team_id): Path<TeamId>,
    Json(update): Json<TeamUpdate>,
) -> ApiResult<Json<Team>> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(invalid_request("Team name must not be blank"));
    }

    state
        .manager
        .update_team(team_id, &update)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Delete a team.
///
/// # Errors
///
/// - `404 Not Found`: Team doesn't exist
/// - `409 Conflict`: Team is still drawn into a group or scheduled in a match
pub async fn delete_team(
    State(state): State<AppState>,
    Path(team_id): Path<TeamId>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .delete_team(team_id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every match the team plays in, across all stages.
pub async fn team_matches(
    State(state): State<AppState>,
    Path(team_id): Path<TeamId>,
) -> ApiResult<Json<Vec<Match>>> {
    state
        .manager
        .team_matches(team_id)
        .await
        .map(Json)
        .map_err(api_error)
}
