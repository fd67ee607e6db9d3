//! OpenAPI Documentation
//!
//! Aggregates every route and schema into one document, served at
//! `/api-docs/openapi.json` (with Swagger UI at `/docs` when enabled).

use utoipa::OpenApi;

use switchboard_core::{
    Agent, AgentStatus, Capability, ContextEntry, HealthState, RoutedRequest, RoutedResponse,
    ServiceEntry, Task, TaskKind, TaskPriority, TaskStatus, Workflow, WorkflowStatus,
};

use crate::error::{ApiError, ErrorCode};
use crate::jobs::SweeperSnapshot;
use crate::routes;
use crate::services::{CapabilityStats, CoordinatorSnapshot, FollowUpHandle, KindUtilization, TaskSpec};
use crate::types::{
    ContextStatsBody, CreateTaskRequest, CreateWorkflowRequest, HealthResponse, HeartbeatRequest,
    HeartbeatResponse, ListAgentsResponse, RegisterAgentRequest, RegisterServiceRequest,
    RouteRequestBody, RouteResponseBody, StartTaskRequest, StatsResponse, TaskOutcomeRequest,
    WorkflowResponse, WorkflowTaskItem,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Switchboard API",
        description = "Capability-routing orchestration layer: service registry, \
                       session context store, request router, and agent coordinator.",
        license(name = "MIT")
    ),
    paths(
        routes::route::route_request,
        routes::heartbeat::heartbeat,
        routes::services::register_service,
        routes::services::list_services,
        routes::services::deregister_service,
        routes::agents::register_agent,
        routes::agents::list_agents,
        routes::agents::get_agent,
        routes::tasks::create_task,
        routes::tasks::get_task,
        routes::tasks::start_task,
        routes::tasks::report_outcome,
        routes::tasks::cancel_task,
        routes::workflows::create_workflow,
        routes::workflows::get_workflow,
        routes::workflows::cancel_workflow,
        routes::stats::stats,
        routes::health::health,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        Capability,
        HealthState,
        AgentStatus,
        TaskKind,
        TaskPriority,
        TaskStatus,
        WorkflowStatus,
        ServiceEntry,
        RoutedRequest,
        RoutedResponse,
        ContextEntry,
        Agent,
        Task,
        Workflow,
        TaskSpec,
        FollowUpHandle,
        CapabilityStats,
        KindUtilization,
        CoordinatorSnapshot,
        SweeperSnapshot,
        RouteRequestBody,
        RouteResponseBody,
        HeartbeatRequest,
        HeartbeatResponse,
        RegisterServiceRequest,
        RegisterAgentRequest,
        ListAgentsResponse,
        CreateTaskRequest,
        StartTaskRequest,
        TaskOutcomeRequest,
        WorkflowTaskItem,
        CreateWorkflowRequest,
        WorkflowResponse,
        ContextStatsBody,
        StatsResponse,
        HealthResponse,
    ))
)]
pub struct ApiDoc;
