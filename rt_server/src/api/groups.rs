//! Group API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use robo_tournament::tournament::{Group, GroupFilter, GroupId, GroupWithMembers, TeamId};
use serde::Deserialize;

use super::{
    AppState,
    error::{ApiResult, api_error},
};

#[derive(Debug, Deserialize)]
pub struct SetWinnerRequest {
    pub team_id: TeamId,
}

/// List groups ordered by stage, then group number.
///
/// # Query Parameters
///
/// - `category_id`, `division_id`, `stage_number`
pub async fn list_groups(
    State(state): State<AppState>,
    Query(filter): Query<GroupFilter>,
) -> ApiResult<Json<Vec<Group>>> {
    state
        .manager
        .list_groups(&filter)
        .await
        .map(Json)
        .map_err(api_error)
}

/// A group with its memberships, most per-group wins first.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<GroupId>,
) -> ApiResult<Json<GroupWithMembers>> {
    state
        .manager
        .get_group(group_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Declare the winner of a group.
///
/// # Request Body
///
/// ```json
/// { "team_id": "6f1c..." }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Group doesn't exist
/// - `409 Conflict`: Group already has a winner
/// - `422 Unprocessable Entity`: Team is not a member of the group
pub async fn set_winner(
    State(state): State<AppState>,
    Path(group_id): Path<GroupId>,
    Json(request): Json<SetWinnerRequest>,
) -> ApiResult<Json<Group>> {
    state
        .manager
        .set_group_winner(group_id, request.team_id)
        .await
        .map(Json)
        .map_err(api_error)
}
