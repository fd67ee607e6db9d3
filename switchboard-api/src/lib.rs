//! Switchboard API - HTTP Orchestration Layer
//!
//! The externally visible surface of the Switchboard orchestrator. Exposes
//! capability routing, heartbeat processing, task/workflow coordination,
//! and observability endpoints over Axum, backed by the in-memory engines
//! in `services/` and the TTL context store from `switchboard-context`.
//!
//! State is deliberately non-durable: a restart is equivalent to all
//! contexts expiring and all services/agents needing to re-register.

pub mod constants;
pub mod error;
pub mod jobs;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use services::{
    AgentCoordinator, HttpTransport, OrchestrateCommand, OrchestrationOutcome, Orchestrator,
    RequestRouter, ServiceRegistry, ServiceTransport, TaskSpec,
};
pub use state::AppState;
