//! Routing Endpoint
//!
//! `POST /route` is the orchestrated entry point: context merge, capability
//! routing, and optional follow-up scheduling in one call.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};

use switchboard_core::TaskPriority;

use crate::error::{ApiError, ApiResult};
use crate::services::{OrchestrateCommand, OrchestrationOutcome, RequestRouter};
use crate::state::AppState;
use crate::types::{RouteRequestBody, RouteResponseBody};

/// POST /route - Route a request to a backend by capability
#[utoipa::path(
    post,
    path = "/route",
    tag = "Routing",
    request_body = RouteRequestBody,
    responses(
        (status = 200, description = "Routed synchronously", body = RouteResponseBody),
        (status = 202, description = "Routed; follow-up work scheduled", body = RouteResponseBody),
        (status = 400, description = "Unknown capability or malformed body", body = ApiError),
        (status = 502, description = "Downstream unavailable after retry", body = ApiError),
        (status = 503, description = "No healthy service for capability", body = ApiError),
        (status = 504, description = "Downstream call timed out", body = ApiError),
    ),
)]
pub async fn route_request(
    State(state): State<AppState>,
    Json(body): Json<RouteRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let capability = RequestRouter::parse_capability(&body.capability)?;
    let priority = match body.priority.as_deref() {
        Some(tag) => TaskPriority::from_db_str(tag)
            .map_err(|e| ApiError::invalid_input(e.to_string()))?,
        None => TaskPriority::default(),
    };
    if body.context_patch.is_some() && body.context_key.is_none() {
        return Err(ApiError::missing_field("context_key"));
    }

    let outcome = state
        .orchestrator
        .handle(OrchestrateCommand {
            capability,
            payload: body.payload,
            caller: body.caller,
            priority,
            context_key: body.context_key,
            context_patch: body.context_patch,
        })
        .await?;

    let (status, response, handle) = match outcome {
        OrchestrationOutcome::Completed(response) => (StatusCode::OK, response, None),
        OrchestrationOutcome::Scheduled { response, handle } => {
            (StatusCode::ACCEPTED, response, Some(handle))
        }
    };

    Ok((
        status,
        Json(RouteResponseBody {
            success: response.success,
            request_id: response.request_id,
            result: response.result,
            service_id: response.service_id,
            processing_time_ms: response.processing_time_ms,
            handle,
        }),
    ))
}

/// Create the routing router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/route", post(route_request))
}
