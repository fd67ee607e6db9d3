//! Service Registration Routes
//!
//! Register and deregister backend tool servers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use uuid::Uuid;

use switchboard_core::{new_entity_id, Capability, ServiceEntry};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;
use crate::types::RegisterServiceRequest;

/// POST /services - Register a backend service
#[utoipa::path(
    post,
    path = "/services",
    tag = "Services",
    request_body = RegisterServiceRequest,
    responses(
        (status = 201, description = "Service registered", body = ServiceEntry),
        (status = 400, description = "Invalid capability or base address", body = ApiError),
    ),
)]
pub async fn register_service(
    State(state): State<AppState>,
    Json(req): Json<RegisterServiceRequest>,
) -> ApiResult<impl IntoResponse> {
    let capability = Capability::from_db_str(&req.capability)
        .map_err(|e| ApiError::new(ErrorCode::UnknownCapability, e.to_string()))?;

    if req.base_address.trim().is_empty() {
        return Err(ApiError::missing_field("base_address"));
    }
    if !req.base_address.starts_with("http://") && !req.base_address.starts_with("https://") {
        return Err(ApiError::invalid_input(
            "base_address must be an http(s) URL",
        ));
    }

    let entry = ServiceEntry::new(
        req.service_id.unwrap_or_else(new_entity_id),
        capability,
        req.base_address,
    );
    let entry = state.registry.register(entry);
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /services - List registered services
#[utoipa::path(
    get,
    path = "/services",
    tag = "Services",
    responses(
        (status = 200, description = "Registry snapshot", body = Vec<ServiceEntry>),
    ),
)]
pub async fn list_services(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.registry.snapshot()))
}

/// DELETE /services/{id} - Deregister a service
#[utoipa::path(
    delete,
    path = "/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service ID")),
    responses(
        (status = 204, description = "Service removed (idempotent)"),
    ),
)]
pub async fn deregister_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    // Deregistration is idempotent: removing an absent id is not an error.
    state.registry.deregister(id);
    Ok(StatusCode::NO_CONTENT)
}

/// Create the services router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/services", post(register_service).get(list_services))
        .route("/services/:id", delete(deregister_service))
}
