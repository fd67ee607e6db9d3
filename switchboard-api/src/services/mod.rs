//! Orchestration engines behind the HTTP layer.
//!
//! Each component owns its tables exclusively; external callers mutate them
//! only through the contracts exposed here. The hosting process creates one
//! instance of each at startup and injects them into the façade.

pub mod coordinator;
pub mod dispatch;
pub mod orchestrator;
pub mod registry;
pub mod router;

pub use coordinator::{AgentCoordinator, CoordinatorSnapshot, KindUtilization, TaskSpec};
pub use dispatch::{HttpTransport, ServiceTransport, TransportError};
pub use orchestrator::{
    FollowUpHandle, OrchestrateCommand, OrchestrationOutcome, Orchestrator,
};
pub use registry::ServiceRegistry;
pub use router::{CapabilityStats, RequestRouter};
