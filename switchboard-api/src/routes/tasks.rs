//! Task Lifecycle Routes
//!
//! Direct task creation plus the callbacks agents use to pick up work and
//! report results.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use uuid::Uuid;

use switchboard_core::{CoordinationError, Task, TaskKind, TaskPriority, TaskStatus};

use crate::error::{ApiError, ApiResult};
use crate::services::TaskSpec;
use crate::state::AppState;
use crate::types::{CreateTaskRequest, StartTaskRequest, TaskOutcomeRequest};

/// Longest assignment wait a caller may request, milliseconds.
const MAX_WAIT_MS: u64 = 5_000;

/// POST /tasks - Create a task and attempt assignment
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task admitted and assigned", body = Task),
        (status = 202, description = "Task admitted, still pending; poll for assignment", body = Task),
        (status = 400, description = "Invalid kind or priority", body = ApiError),
    ),
)]
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let kind =
        TaskKind::from_db_str(&req.kind).map_err(|e| ApiError::invalid_input(e.to_string()))?;
    let priority = match req.priority.as_deref() {
        Some(tag) => TaskPriority::from_db_str(tag)
            .map_err(|e| ApiError::invalid_input(e.to_string()))?,
        None => TaskPriority::default(),
    };

    let task = state.coordinator.create_task(
        TaskSpec {
            kind,
            priority,
            payload: req.payload,
        },
        req.context_key,
    )?;

    // Optional bounded wait: the task stays admitted either way, the
    // caller is just told whether to poll.
    let task = match req.wait_ms {
        Some(wait_ms) if task.status == TaskStatus::Pending => {
            let bound = Duration::from_millis(wait_ms.min(MAX_WAIT_MS));
            match state.coordinator.await_assignment(task.task_id, bound).await {
                Ok(task) => task,
                Err(CoordinationError::AssignmentTimeout { .. }) => {
                    state.coordinator.get_task(task.task_id)?
                }
                Err(e) => return Err(e.into()),
            }
        }
        _ => task,
    };

    let status = if task.status == TaskStatus::Pending {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(task)))
}

/// GET /tasks/{id} - Poll a task
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task details", body = Task),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.get_task(id)?))
}

/// POST /tasks/{id}/start - Agent picks its assigned task up
#[utoipa::path(
    post,
    path = "/tasks/{id}/start",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = StartTaskRequest,
    responses(
        (status = 200, description = "Task is now running", body = Task),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Task not assigned to this agent", body = ApiError),
    ),
)]
pub async fn start_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StartTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.start_task(id, req.agent_id)?))
}

/// POST /tasks/{id}/outcome - Agent reports completion or failure
#[utoipa::path(
    post,
    path = "/tasks/{id}/outcome",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = TaskOutcomeRequest,
    responses(
        (status = 200, description = "Outcome recorded", body = Task),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Stale outcome; task was reassigned", body = ApiError),
    ),
)]
pub async fn report_outcome(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TaskOutcomeRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state.coordinator.report_outcome(
        id,
        req.agent_id,
        req.success,
        req.result,
        req.error,
    )?;
    Ok(Json(task))
}

/// POST /tasks/{id}/cancel - Cancel a pending or assigned task
#[utoipa::path(
    post,
    path = "/tasks/{id}/cancel",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task cancelled", body = Task),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Task already running or terminal", body = ApiError),
    ),
)]
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.cancel_task(id)?))
}

/// Create the tasks router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/:id", get(get_task))
        .route("/tasks/:id/start", post(start_task))
        .route("/tasks/:id/outcome", post(report_outcome))
        .route("/tasks/:id/cancel", post(cancel_task))
}
