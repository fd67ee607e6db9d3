//! Workflow Routes
//!
//! Atomic multi-task admission with derived aggregate status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use switchboard_core::{TaskKind, TaskPriority, Workflow};

use crate::error::{ApiError, ApiResult};
use crate::services::TaskSpec;
use crate::state::AppState;
use crate::types::{CreateWorkflowRequest, WorkflowResponse};

/// POST /workflows - Create a workflow of tasks atomically
#[utoipa::path(
    post,
    path = "/workflows",
    tag = "Workflows",
    request_body = CreateWorkflowRequest,
    responses(
        (status = 201, description = "Workflow and all member tasks admitted", body = WorkflowResponse),
        (status = 400, description = "Empty workflow or invalid member spec", body = ApiError),
    ),
)]
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkflowRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.tasks.is_empty() {
        return Err(ApiError::invalid_input(
            "Workflow must contain at least one task",
        ));
    }

    // Validate every member before admitting any: all-or-nothing.
    let mut specs = Vec::with_capacity(req.tasks.len());
    for item in &req.tasks {
        let kind = TaskKind::from_db_str(&item.kind)
            .map_err(|e| ApiError::invalid_input(e.to_string()))?;
        let priority = match item.priority.as_deref() {
            Some(tag) => TaskPriority::from_db_str(tag)
                .map_err(|e| ApiError::invalid_input(e.to_string()))?,
            None => TaskPriority::default(),
        };
        specs.push(TaskSpec {
            kind,
            priority,
            payload: item.payload.clone(),
        });
    }

    let (workflow, tasks) = state.coordinator.create_workflow(specs, req.context_key)?;
    Ok((StatusCode::CREATED, Json(WorkflowResponse { workflow, tasks })))
}

/// GET /workflows/{id} - Poll a workflow and its members
#[utoipa::path(
    get,
    path = "/workflows/{id}",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "Workflow ID")),
    responses(
        (status = 200, description = "Workflow with member tasks", body = WorkflowResponse),
        (status = 404, description = "Workflow not found", body = ApiError),
    ),
)]
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (workflow, tasks) = state.coordinator.get_workflow(id)?;
    Ok(Json(WorkflowResponse { workflow, tasks }))
}

/// POST /workflows/{id}/cancel - Best-effort workflow cancellation
#[utoipa::path(
    post,
    path = "/workflows/{id}/cancel",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "Workflow ID")),
    responses(
        (status = 200, description = "Workflow cancelled; running members finish cooperatively", body = Workflow),
        (status = 404, description = "Workflow not found", body = ApiError),
    ),
)]
pub async fn cancel_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.cancel_workflow(id)?))
}

/// Create the workflows router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/workflows", post(create_workflow))
        .route("/workflows/:id", get(get_workflow))
        .route("/workflows/:id/cancel", post(cancel_workflow))
}
