//! Health Check Endpoint
//!
//! `GET /health` reports the orchestrator's own liveness, independent of
//! downstream service health. No authentication required.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::types::HealthResponse;

/// GET /health - Orchestrator liveness
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Orchestrator is alive", body = HealthResponse),
    ),
)]
pub async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let coordinator = state.coordinator.snapshot()?;
    let contexts = state.contexts.stats();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        registered_services: state.registry.len() as u64,
        registered_agents: coordinator.agents,
        live_contexts: contexts.entries,
        pending_tasks: coordinator.pending_tasks,
    }))
}

/// Create the health router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
