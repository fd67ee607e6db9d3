//! API Request and Response Types
//!
//! Wire types for the Switchboard HTTP surface. Capability tags, priorities,
//! and kinds arrive as strings and are validated against the closed enums in
//! the handlers, so a bad tag is a 400 with a typed error body rather than a
//! bare deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use switchboard_core::{Agent, EntityId, ServiceEntry, Task, Workflow};

use crate::services::{CapabilityStats, CoordinatorSnapshot, FollowUpHandle};

// ============================================================================
// ROUTE TYPES
// ============================================================================

/// Body of `POST /route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RouteRequestBody {
    /// Capability tag: academic | resource | communication | analytics
    pub capability: String,
    /// Payload forwarded verbatim to the selected backend
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: Value,
    /// Opaque caller identity, forwarded verbatim
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub caller: Option<Value>,
    /// Priority for any follow-up work: low | normal | high | urgent
    pub priority: Option<String>,
    /// Session context key to merge/attach before routing
    pub context_key: Option<String>,
    /// Fields merged into the context under `context_key` before routing
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub context_patch: Option<BTreeMap<String, Value>>,
}

/// Body returned by `POST /route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RouteResponseBody {
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub request_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub result: Option<Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub service_id: EntityId,
    pub processing_time_ms: u64,
    /// Present when the backend scheduled asynchronous follow-up work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<FollowUpHandle>,
}

// ============================================================================
// HEARTBEAT TYPES
// ============================================================================

/// Body of `POST /heartbeat`. Exactly one of `service_id` or `agent_id`
/// must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HeartbeatRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub service_id: Option<Uuid>,
    /// Reported health for a service heartbeat:
    /// unknown | healthy | degraded | unreachable
    pub health: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub agent_id: Option<Uuid>,
}

/// Snapshot returned by `POST /heartbeat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HeartbeatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    /// Full registry snapshot (service heartbeats)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceEntry>>,
    /// Full agent snapshot (agent heartbeats)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<Agent>>,
}

// ============================================================================
// SERVICE REGISTRATION TYPES
// ============================================================================

/// Body of `POST /services`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterServiceRequest {
    /// Client-supplied id; replaces any existing entry with the same id.
    /// Generated when absent.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub service_id: Option<Uuid>,
    /// Capability tag: academic | resource | communication | analytics
    pub capability: String,
    pub base_address: String,
}

// ============================================================================
// AGENT TYPES
// ============================================================================

/// Body of `POST /agents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterAgentRequest {
    /// Declared kind: content_generation | prediction | recommendation |
    /// notification
    pub kind: String,
}

/// Body returned by `GET /agents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListAgentsResponse {
    pub agents: Vec<Agent>,
    pub total: usize,
}

// ============================================================================
// TASK TYPES
// ============================================================================

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTaskRequest {
    pub kind: String,
    pub priority: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: Value,
    pub context_key: Option<String>,
    /// Bounded wait for assignment before answering; the task stays
    /// admitted either way.
    pub wait_ms: Option<u64>,
}

/// Body of `POST /tasks/{id}/start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StartTaskRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub agent_id: Uuid,
}

/// Body of `POST /tasks/{id}/outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskOutcomeRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub agent_id: Uuid,
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub result: Option<Value>,
    pub error: Option<String>,
}

// ============================================================================
// WORKFLOW TYPES
// ============================================================================

/// One member of a `POST /workflows` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowTaskItem {
    pub kind: String,
    pub priority: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: Value,
}

/// Body of `POST /workflows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateWorkflowRequest {
    pub tasks: Vec<WorkflowTaskItem>,
    pub context_key: Option<String>,
}

/// Body returned by workflow endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowResponse {
    pub workflow: Workflow,
    pub tasks: Vec<Task>,
}

// ============================================================================
// STATS AND HEALTH TYPES
// ============================================================================

/// Context store counters, flattened for the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContextStatsBody {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: u64,
    pub hit_rate: f64,
}

/// Body returned by `GET /stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatsResponse {
    pub capabilities: Vec<CapabilityStats>,
    pub coordinator: CoordinatorSnapshot,
    pub contexts: ContextStatsBody,
    pub sweeper: crate::jobs::SweeperSnapshot,
}

/// Body returned by `GET /health`. Reports the orchestrator's own liveness,
/// independent of downstream health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub registered_services: u64,
    pub registered_agents: u64,
    pub live_contexts: u64,
    pub pending_tasks: u64,
}
