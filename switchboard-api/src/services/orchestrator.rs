//! Orchestrator Façade
//!
//! The externally visible entry point composing router, context store, and
//! coordinator into one request lifecycle:
//!
//!   merge context → route → optionally spawn follow-up work → answer
//!
//! The façade performs no business logic of its own; it exists to guarantee
//! a single total ordering of these steps per request. Context is written
//! to the store before any task is created, so work spawned (or later
//! reassigned) under the same context key always finds the latest context.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use switchboard_context::ContextStore;
use switchboard_core::{
    Capability, EntityId, RoutedRequest, RoutedResponse, SwitchboardError, TaskPriority,
};

use crate::services::coordinator::{AgentCoordinator, TaskSpec};
use crate::services::router::RequestRouter;

// ============================================================================
// COMMAND AND OUTCOME
// ============================================================================

/// One orchestrated request, as assembled by the HTTP layer.
#[derive(Debug, Clone)]
pub struct OrchestrateCommand {
    pub capability: Capability,
    pub payload: Value,
    pub caller: Option<Value>,
    pub priority: TaskPriority,
    pub context_key: Option<String>,
    pub context_patch: Option<BTreeMap<String, Value>>,
}

/// Poll handle for follow-up work spawned by a routed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FollowUpHandle {
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub task_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub workflow_id: Option<EntityId>,
}

/// Result of one orchestrated request.
#[derive(Debug, Clone)]
pub enum OrchestrationOutcome {
    /// The routed service answered synchronously; nothing else to do.
    Completed(RoutedResponse),
    /// The routed service requested asynchronous work; the caller polls the
    /// handle for completion.
    Scheduled {
        response: RoutedResponse,
        handle: FollowUpHandle,
    },
}

/// Follow-up work descriptor a backend may embed in its result under the
/// `followup` key: one task spec creates a task, several create a workflow.
#[derive(Debug, Clone, Deserialize)]
struct FollowUp {
    tasks: Vec<TaskSpec>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Composes the three components. Created once at startup with its
/// dependencies injected; holds no state of its own.
pub struct Orchestrator {
    router: Arc<RequestRouter>,
    contexts: Arc<ContextStore>,
    coordinator: Arc<AgentCoordinator>,
}

impl Orchestrator {
    pub fn new(
        router: Arc<RequestRouter>,
        contexts: Arc<ContextStore>,
        coordinator: Arc<AgentCoordinator>,
    ) -> Self {
        Self {
            router,
            contexts,
            coordinator,
        }
    }

    /// Run one request through the fixed lifecycle.
    pub async fn handle(
        &self,
        command: OrchestrateCommand,
    ) -> Result<OrchestrationOutcome, SwitchboardError> {
        // 1. Attach context before anything downstream can observe it.
        if let (Some(key), Some(patch)) = (&command.context_key, command.context_patch.clone()) {
            let entry = self.contexts.merge(key, patch, None).await;
            tracing::debug!(
                context_key = %key,
                version = entry.version,
                "Context merged for request"
            );
        }

        // 2. Route.
        let request = {
            let mut request = RoutedRequest::new(command.capability, command.payload.clone())
                .with_priority(command.priority);
            if let Some(caller) = command.caller.clone() {
                request = request.with_caller(caller);
            }
            request
        };
        let request_id = request.request_id;
        let response = self.router.route(request).await.map_err(SwitchboardError::from)?;

        // 3. Spawn follow-up work if the backend asked for it.
        let followup = response
            .result
            .as_ref()
            .and_then(|result| result.get("followup"))
            .cloned();
        let Some(followup) = followup else {
            return Ok(OrchestrationOutcome::Completed(response));
        };

        let followup: FollowUp = match serde_json::from_value(followup) {
            Ok(parsed) => parsed,
            Err(err) => {
                // A malformed descriptor is a backend bug; the caller still
                // gets its successful synchronous response.
                tracing::warn!(
                    request_id = %request_id,
                    error = %err,
                    "Ignoring malformed followup descriptor"
                );
                return Ok(OrchestrationOutcome::Completed(response));
            }
        };
        if followup.tasks.is_empty() {
            return Ok(OrchestrationOutcome::Completed(response));
        }

        let mut specs = self.enrich_specs(followup.tasks, command.context_key.as_deref()).await;
        let handle = if specs.len() == 1 {
            let spec = specs.remove(0);
            let task = self
                .coordinator
                .create_task(spec, command.context_key.clone())?;
            tracing::info!(
                request_id = %request_id,
                task_id = %task.task_id,
                "Follow-up task scheduled"
            );
            FollowUpHandle {
                task_id: Some(task.task_id),
                workflow_id: None,
            }
        } else {
            let (workflow, _) = self
                .coordinator
                .create_workflow(specs, command.context_key.clone())?;
            tracing::info!(
                request_id = %request_id,
                workflow_id = %workflow.workflow_id,
                "Follow-up workflow scheduled"
            );
            FollowUpHandle {
                task_id: None,
                workflow_id: Some(workflow.workflow_id),
            }
        };

        Ok(OrchestrationOutcome::Scheduled { response, handle })
    }

    /// Copy the current context snapshot into each object-shaped task
    /// payload so a worker sees the session state the request established.
    async fn enrich_specs(&self, mut specs: Vec<TaskSpec>, context_key: Option<&str>) -> Vec<TaskSpec> {
        let Some(key) = context_key else {
            return specs;
        };
        let Some(entry) = self.contexts.get(key).await else {
            return specs;
        };
        let context = serde_json::to_value(&entry.payload).unwrap_or(Value::Null);
        for spec in specs.iter_mut() {
            if let Value::Object(payload) = &mut spec.payload {
                payload.insert("context".to_string(), context.clone());
            }
        }
        specs
    }
}
