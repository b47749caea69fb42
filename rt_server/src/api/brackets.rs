//! Bracket-level API handlers: drawing, advancing and resetting stages.
//!
//! A bracket is addressed by its category and division:
//! `/api/v1/brackets/{category_id}/{division_id}/...`
//!
//! # Examples
//!
//! Draw stage 1 and later advance the winners:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/brackets/1/2/generate
//! curl -X POST http://localhost:6969/api/v1/brackets/1/2/advance
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use robo_tournament::tournament::{
    AdvanceOutcome, Bracket, CategoryId, DivisionId, Group, GroupWithMembers, StageStatus,
    TeamId, TeardownSummary,
};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    error::{ApiResult, api_error},
    request_id::RequestId,
};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct StandingsQuery {
    pub stage_number: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub stage_number: i32,
    pub groups: Vec<Group>,
}

/// Response of an advancement request
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub advanced: bool,
    pub message: String,
    /// `advanced`, `incomplete_groups`, `no_winners` or `champion_crowned`
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_stage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub champion_id: Option<TeamId>,
}

impl From<AdvanceOutcome> for AdvanceResponse {
    fn from(outcome: AdvanceOutcome) -> Self {
        let next_stage = match outcome {
            AdvanceOutcome::Advanced { next_stage, .. } => Some(next_stage),
            _ => None,
        };
        Self {
            advanced: outcome.advanced(),
            message: outcome.message(),
            outcome: outcome_label(&outcome),
            next_stage,
            champion_id: outcome.champion_id(),
        }
    }
}

fn bracket((category_id, division_id): (CategoryId, DivisionId)) -> Bracket {
    Bracket::new(category_id, division_id)
}

fn outcome_label(outcome: &AdvanceOutcome) -> &'static str {
    match outcome {
        AdvanceOutcome::Advanced { .. } => "advanced",
        AdvanceOutcome::IncompleteGroups { .. } => "incomplete_groups",
        AdvanceOutcome::NoWinners => "no_winners",
        AdvanceOutcome::ChampionCrowned { .. } => "champion_crowned",
    }
}

/// State of the bracket's current stage.
///
/// # Errors
///
/// - `404 Not Found`: The bracket has not been drawn
pub async fn stage_status(
    State(state): State<AppState>,
    Path(ids): Path<(CategoryId, DivisionId)>,
) -> ApiResult<Json<StageStatus>> {
    state
        .manager
        .stage_status(bracket(ids))
        .await
        .map(Json)
        .map_err(api_error)
}

/// Groups of a stage with their members (current stage by default).
pub async fn standings(
    State(state): State<AppState>,
    Path(ids): Path<(CategoryId, DivisionId)>,
    Query(query): Query<StandingsQuery>,
) -> ApiResult<Json<Vec<GroupWithMembers>>> {
    state
        .manager
        .standings(bracket(ids), query.stage_number)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Draw stage 1 from the bracket's eligible teams.
///
/// Any previous groups and matches of the bracket are discarded.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Fewer than two eligible teams
pub async fn generate(
    State(state): State<AppState>,
    Path(ids): Path<(CategoryId, DivisionId)>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let bracket = bracket(ids);
    let groups = state
        .manager
        .generate_first_stage(bracket)
        .await
        .map_err(api_error)?;

    metrics::stages_generated_total(bracket.category_id);
    logging::log_bracket_operation(
        "generate",
        bracket.category_id,
        bracket.division_id,
        &format!("{} group(s)", groups.len()),
    );

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            stage_number: 1,
            groups,
        }),
    ))
}

/// Advance the winners of the current stage.
///
/// Incomplete stages and a crowned champion are reported with `200 OK` and
/// `advanced: false`.
///
/// # Response
///
/// ```json
/// { "advanced": true, "message": "Advanced 4 winners to Stage 2",
///   "outcome": "advanced", "next_stage": 2 }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: The bracket has not been drawn
pub async fn advance(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(ids): Path<(CategoryId, DivisionId)>,
) -> ApiResult<Json<AdvanceResponse>> {
    let bracket = bracket(ids);
    let outcome = state
        .manager
        .advance_stage(bracket)
        .await
        .map_err(api_error)?;

    if outcome.advanced() {
        metrics::stages_generated_total(bracket.category_id);
    }
    let response = AdvanceResponse::from(outcome);
    metrics::advance_outcomes_total(response.outcome);
    tracing::debug!(request_id = request_id.as_str(), "{}", response.message);
    logging::log_bracket_operation(
        "advance",
        bracket.category_id,
        bracket.division_id,
        &response.message,
    );

    Ok(Json(response))
}

/// Delete every group and match of the bracket.
pub async fn reset_groups(
    State(state): State<AppState>,
    Path(ids): Path<(CategoryId, DivisionId)>,
) -> ApiResult<Json<TeardownSummary>> {
    let bracket = bracket(ids);
    let summary = state
        .manager
        .reset_groups(bracket)
        .await
        .map_err(api_error)?;

    logging::log_bracket_operation(
        "reset",
        bracket.category_id,
        bracket.division_id,
        &format!("{} group(s) removed", summary.groups_removed),
    );
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_advance_response_shape() {
        let champion_id = Uuid::new_v4();
        let response = AdvanceResponse::from(AdvanceOutcome::ChampionCrowned { champion_id });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["advanced"], false);
        assert_eq!(json["champion_id"], champion_id.to_string());
        assert_eq!(json["outcome"], "champion_crowned");
    }

    #[test]
    fn test_champion_id_omitted_while_advancing() {
        let response = AdvanceResponse::from(AdvanceOutcome::Advanced {
            next_stage: 2,
            advanced: 4,
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["advanced"], true);
        assert!(json.get("champion_id").is_none());
        assert_eq!(json["next_stage"], 2);
        assert_eq!(json["message"], "Advanced 4 winners to Stage 2");
    }
}
