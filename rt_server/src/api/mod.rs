//! HTTP API for the tournament server.
//!
//! Exposes team registration, group and match results, and bracket-level
//! stage control as JSON endpoints.
//!
//! # Modules
//!
//! - [`teams`]: Team registration and editing
//! - [`groups`]: Group listing and winner declaration
//! - [`matches`]: Match listing, scheduling and result recording
//! - [`brackets`]: Drawing, advancing and resetting a bracket's stages
//! - [`error`]: Engine error to HTTP status mapping
//! - [`request_id`]: Request correlation and per-request metrics
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rt_server::api::{create_router, AppState};
//! use robo_tournament::db::MemoryTournamentRepository;
//! use robo_tournament::tournament::{BracketConfig, TournamentManager};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let manager = TournamentManager::new(
//!     Arc::new(MemoryTournamentRepository::new()),
//!     BracketConfig::default(),
//! );
//! let app = create_router(AppState::new(manager));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! There is no authentication layer; mutating endpoints are expected to sit
//! behind an authorizing gateway.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod error;
pub mod groups;
pub mod matches;
pub mod request_id;
pub mod teams;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use robo_tournament::TournamentManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// This state is cloned for each request (cheap due to the Arc wrapper).
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
}

impl AppState {
    pub fn new(manager: TournamentManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health
/// GET    /api/v1/teams                                     POST /api/v1/teams
/// GET    /api/v1/teams/{id}          PATCH  /api/v1/teams/{id}   DELETE /api/v1/teams/{id}
/// GET    /api/v1/teams/{id}/matches
/// GET    /api/v1/groups              GET    /api/v1/groups/{id}
/// POST   /api/v1/groups/{id}/winner
/// GET    /api/v1/matches             POST   /api/v1/matches
/// GET    /api/v1/matches/{id}        POST   /api/v1/matches/{id}/result
/// GET    /api/v1/brackets/{category_id}/{division_id}/stage
/// GET    /api/v1/brackets/{category_id}/{division_id}/standings
/// POST   /api/v1/brackets/{category_id}/{division_id}/generate
/// POST   /api/v1/brackets/{category_id}/{division_id}/advance
/// DELETE /api/v1/brackets/{category_id}/{division_id}/groups
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let team_routes = Router::new()
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route(
            "/teams/{team_id}",
            get(teams::get_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        .route("/teams/{team_id}/matches", get(teams::team_matches));

    let group_routes = Router::new()
        .route("/groups", get(groups::list_groups))
        .route("/groups/{group_id}", get(groups::get_group))
        .route("/groups/{group_id}/winner", post(groups::set_winner));

    let match_routes = Router::new()
        .route(
            "/matches",
            get(matches::list_matches).post(matches::create_match),
        )
        .route("/matches/{match_id}", get(matches::get_match))
        .route("/matches/{match_id}/result", post(matches::record_result));

    let bracket_routes = Router::new()
        .route(
            "/brackets/{category_id}/{division_id}/stage",
            get(brackets::stage_status),
        )
        .route(
            "/brackets/{category_id}/{division_id}/standings",
            get(brackets::standings),
        )
        .route(
            "/brackets/{category_id}/{division_id}/generate",
            post(brackets::generate),
        )
        .route(
            "/brackets/{category_id}/{division_id}/advance",
            post(brackets::advance),
        )
        .route(
            "/brackets/{category_id}/{division_id}/groups",
            axum::routing::delete(brackets::reset_groups),
        );

    Router::new()
        .merge(team_routes)
        .merge(group_routes)
        .merge(match_routes)
        .merge(bracket_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if storage is reachable, or `503 Service Unavailable`
/// otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":true,"version":"1.0.0","timestamp":"2026-10-16T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
