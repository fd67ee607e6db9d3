//! Agent Registration Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use switchboard_core::{Agent, TaskKind};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{ListAgentsResponse, RegisterAgentRequest};

/// POST /agents - Register a worker agent
#[utoipa::path(
    post,
    path = "/agents",
    tag = "Agents",
    request_body = RegisterAgentRequest,
    responses(
        (status = 201, description = "Agent registered in idle status", body = Agent),
        (status = 400, description = "Invalid agent kind", body = ApiError),
    ),
)]
pub async fn register_agent(
    State(state): State<AppState>,
    Json(req): Json<RegisterAgentRequest>,
) -> ApiResult<impl IntoResponse> {
    let kind = TaskKind::from_db_str(&req.kind)
        .map_err(|e| ApiError::invalid_input(e.to_string()))?;
    let agent = state.coordinator.register_agent(kind)?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// GET /agents - List registered agents
#[utoipa::path(
    get,
    path = "/agents",
    tag = "Agents",
    responses(
        (status = 200, description = "Agent pool snapshot", body = ListAgentsResponse),
    ),
)]
pub async fn list_agents(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let agents = state.coordinator.agents_snapshot()?;
    let total = agents.len();
    Ok(Json(ListAgentsResponse { agents, total }))
}

/// GET /agents/{id} - Get one agent
#[utoipa::path(
    get,
    path = "/agents/{id}",
    tag = "Agents",
    params(("id" = Uuid, Path, description = "Agent ID")),
    responses(
        (status = 200, description = "Agent details", body = Agent),
        (status = 404, description = "Agent not found", body = ApiError),
    ),
)]
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.get_agent(id)?))
}

/// Create the agents router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/agents", post(register_agent).get(list_agents))
        .route("/agents/:id", get(get_agent))
}
