//! Core data types for the Switchboard orchestration layer.
//!
//! Switchboard sits between client-facing services of a school platform and
//! a set of specialized backend tool servers (academic data, resource
//! management, communication, analytics). This crate holds the shared
//! vocabulary: identifiers, closed enumerations, entity structs, the error
//! taxonomy, and per-component configuration.
//!
//! Component crates build on top of it:
//! - `switchboard-context`: TTL-bounded session context store
//! - `switchboard-api`: registry, router, coordinator, and the HTTP façade

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use config::{
    ContextConfig, CoordinatorConfig, RegistryConfig, RouterConfig,
    DEFAULT_AGENT_HEARTBEAT_SECS, DEFAULT_CONTEXT_TTL_SECS, DEFAULT_DISPATCH_TIMEOUT_SECS,
    DEFAULT_MAX_TASK_ATTEMPTS, DEFAULT_SERVICE_STALENESS_SECS,
};
pub use entities::{
    Agent, ContextEntry, RoutedRequest, RoutedResponse, ServiceEntry, Task, Workflow,
};
pub use enums::{
    AgentStatus, Capability, CapabilityParseError, HealthState, HealthStateParseError, TaskKind,
    TaskKindParseError, TaskPriority, TaskPriorityParseError, TaskStatus, WorkflowStatus,
};
pub use error::{
    CoordinationError, RegistryError, RouteError, SwitchboardError, SwitchboardResult,
};
pub use identity::{new_entity_id, EntityId, Timestamp};
