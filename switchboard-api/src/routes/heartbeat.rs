//! Heartbeat Endpoint
//!
//! `POST /heartbeat` serves both backend services (with a reported health
//! state) and agents (liveness only). Either way the caller gets the
//! current snapshot back, so one round trip doubles as a sync.

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};

use switchboard_core::HealthState;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{HeartbeatRequest, HeartbeatResponse};

/// POST /heartbeat - Record a service or agent heartbeat
#[utoipa::path(
    post,
    path = "/heartbeat",
    tag = "Heartbeat",
    request_body = HeartbeatRequest,
    responses(
        (status = 200, description = "Heartbeat recorded; current snapshot returned", body = HeartbeatResponse),
        (status = 400, description = "Neither service_id nor agent_id present", body = ApiError),
        (status = 404, description = "Unknown service or agent", body = ApiError),
    ),
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(body): Json<HeartbeatRequest>,
) -> ApiResult<impl IntoResponse> {
    match (body.service_id, body.agent_id) {
        (Some(service_id), None) => {
            let health = match body.health.as_deref() {
                Some(tag) => HealthState::from_db_str(tag)
                    .map_err(|e| ApiError::invalid_input(e.to_string()))?,
                None => HealthState::Healthy,
            };
            let service = state.registry.record_heartbeat(service_id, health)?;
            Ok(Json(HeartbeatResponse {
                service: Some(service),
                agent: None,
                services: Some(state.registry.snapshot()),
                agents: None,
            }))
        }
        (None, Some(agent_id)) => {
            let agent = state.coordinator.agent_heartbeat(agent_id)?;
            Ok(Json(HeartbeatResponse {
                service: None,
                agent: Some(agent),
                services: None,
                agents: Some(state.coordinator.agents_snapshot()?),
            }))
        }
        (Some(_), Some(_)) => Err(ApiError::invalid_input(
            "Provide service_id or agent_id, not both",
        )),
        (None, None) => Err(ApiError::invalid_input(
            "Provide service_id (services) or agent_id (agents)",
        )),
    }
}

/// Create the heartbeat router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/heartbeat", post(heartbeat))
}
