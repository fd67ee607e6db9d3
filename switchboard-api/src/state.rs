//! Shared application state for Axum routers.

use std::sync::Arc;

use switchboard_context::ContextStore;

use crate::jobs::SweeperMetrics;
use crate::services::{AgentCoordinator, Orchestrator, RequestRouter, ServiceRegistry};

/// Application-wide state shared across all routes.
///
/// Each component is created once by the hosting process and injected here;
/// no route constructs or replaces a component at request time.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub contexts: Arc<ContextStore>,
    pub router: Arc<RequestRouter>,
    pub coordinator: Arc<AgentCoordinator>,
    pub orchestrator: Arc<Orchestrator>,
    pub sweeper_metrics: Arc<SweeperMetrics>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        contexts: Arc<ContextStore>,
        router: Arc<RequestRouter>,
        coordinator: Arc<AgentCoordinator>,
        orchestrator: Arc<Orchestrator>,
        sweeper_metrics: Arc<SweeperMetrics>,
    ) -> Self {
        Self {
            registry,
            contexts,
            router,
            coordinator,
            orchestrator,
            sweeper_metrics,
            start_time: std::time::Instant::now(),
        }
    }
}
