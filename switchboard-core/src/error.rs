//! Error types for Switchboard operations

use crate::{Capability, TaskStatus};
use thiserror::Error;
use uuid::Uuid;

/// Service registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No healthy service available for capability {capability}")]
    NoAvailableService { capability: Capability },

    #[error("Service not registered: {service_id}")]
    ServiceNotFound { service_id: Uuid },
}

/// Routing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unknown capability: {tag}")]
    UnknownCapability { tag: String },

    #[error("No healthy service available for capability {capability}")]
    NoAvailableService { capability: Capability },

    #[error("Downstream service unavailable for {capability}: {reason}")]
    ServiceUnavailable {
        capability: Capability,
        reason: String,
    },

    #[error("Request to {capability} timed out after {timeout_ms}ms")]
    Timeout { capability: Capability, timeout_ms: u64 },
}

/// Agent coordination errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("Agent not registered: {agent_id}")]
    AgentNotRegistered { agent_id: Uuid },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },

    #[error("Workflow not found: {workflow_id}")]
    WorkflowNotFound { workflow_id: Uuid },

    #[error("Illegal task transition for {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Stale outcome for task {task_id} from agent {agent_id}: task was reassigned")]
    StaleOutcome { task_id: Uuid, agent_id: Uuid },

    #[error("No agent became available for task {task_id} within the wait bound")]
    AssignmentTimeout { task_id: Uuid },

    #[error("Agent {agent_id} lost (missed heartbeat deadline)")]
    AgentLost { agent_id: Uuid },

    #[error("Workflow must contain at least one task")]
    EmptyWorkflow,

    #[error("Coordinator lock poisoned")]
    LockPoisoned,
}

/// Master error type for all Switchboard errors.
#[derive(Debug, Clone, Error)]
pub enum SwitchboardError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Switchboard operations.
pub type SwitchboardResult<T> = Result<T, SwitchboardError>;

// =============================================================================
// TESTS
// =============================================================================
