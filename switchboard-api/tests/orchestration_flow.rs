//! End-to-end orchestration scenarios.
//!
//! These tests compose the real registry, context store, router, and
//! coordinator behind the façade, with a scripted transport standing in for
//! backend tool servers.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use switchboard_api::services::dispatch::TransportError;
use switchboard_api::{
    AgentCoordinator, OrchestrateCommand, OrchestrationOutcome, Orchestrator, RequestRouter,
    ServiceRegistry, ServiceTransport,
};
use switchboard_context::ContextStore;
use switchboard_core::{
    new_entity_id, Capability, ContextConfig, CoordinatorConfig, HealthState, RegistryConfig,
    RoutedRequest, RouteError, RouterConfig, ServiceEntry, SwitchboardError, TaskKind,
    TaskPriority, TaskStatus, WorkflowStatus,
};

// ============================================================================
// HARNESS
// ============================================================================

/// Transport that echoes the forwarded payload back as the backend result,
/// so tests can script follow-up descriptors from the caller side.
struct EchoTransport;

#[async_trait]
impl ServiceTransport for EchoTransport {
    async fn dispatch(
        &self,
        entry: &ServiceEntry,
        request: &RoutedRequest,
    ) -> Result<Value, TransportError> {
        if request
            .payload
            .get("simulate_unreachable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(TransportError::Connect {
                reason: "connection refused".to_string(),
            });
        }
        let mut result = request.payload.clone();
        if let Value::Object(map) = &mut result {
            map.insert("served_by".to_string(), json!(entry.service_id));
        }
        Ok(result)
    }
}

struct Harness {
    registry: Arc<ServiceRegistry>,
    contexts: Arc<ContextStore>,
    coordinator: Arc<AgentCoordinator>,
    router: Arc<RequestRouter>,
    orchestrator: Orchestrator,
}

fn harness() -> Harness {
    let registry = Arc::new(ServiceRegistry::new(RegistryConfig::default()));
    let contexts = Arc::new(ContextStore::new(ContextConfig::default()));
    let coordinator = Arc::new(AgentCoordinator::new(CoordinatorConfig {
        max_task_attempts: 2,
        heartbeat_interval: std::time::Duration::from_secs(15),
    }));
    let router = Arc::new(RequestRouter::new(
        Arc::clone(&registry),
        Arc::new(EchoTransport),
        RouterConfig::default(),
    ));
    let orchestrator = Orchestrator::new(
        Arc::clone(&router),
        Arc::clone(&contexts),
        Arc::clone(&coordinator),
    );
    Harness {
        registry,
        contexts,
        coordinator,
        router,
        orchestrator,
    }
}

fn healthy_service(capability: Capability) -> ServiceEntry {
    let mut entry = ServiceEntry::new(
        new_entity_id(),
        capability,
        "http://backend.internal:8080".to_string(),
    );
    entry.health = HealthState::Healthy;
    entry.last_heartbeat_at = Some(Utc::now());
    entry
}

fn command(capability: Capability, payload: Value) -> OrchestrateCommand {
    OrchestrateCommand {
        capability,
        payload,
        caller: None,
        priority: TaskPriority::default(),
        context_key: None,
        context_patch: None,
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn route_hits_registered_service_then_fails_after_deregistration() {
    let h = harness();
    let service = h.registry.register(healthy_service(Capability::Academic));

    let outcome = h
        .orchestrator
        .handle(command(Capability::Academic, json!({"q": "grades"})))
        .await
        .unwrap();

    let OrchestrationOutcome::Completed(response) = outcome else {
        panic!("expected a synchronous completion");
    };
    assert!(response.success);
    assert_eq!(response.service_id, service.service_id);
    assert_eq!(
        response.result.unwrap().get("served_by"),
        Some(&json!(service.service_id))
    );

    // Deregister and route again: NoAvailableService, surfaced immediately.
    h.registry.deregister(service.service_id);
    let err = h
        .orchestrator
        .handle(command(Capability::Academic, json!({"q": "grades"})))
        .await
        .unwrap_err();
    match err {
        SwitchboardError::Route(RouteError::NoAvailableService { capability }) => {
            assert_eq!(capability, Capability::Academic)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn transport_failure_without_alternate_is_service_unavailable() {
    let h = harness();
    h.registry.register(healthy_service(Capability::Resource));

    let err = h
        .orchestrator
        .handle(command(
            Capability::Resource,
            json!({"simulate_unreachable": true}),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwitchboardError::Route(RouteError::ServiceUnavailable { .. })
    ));
}

#[tokio::test]
async fn context_is_attached_before_routing_and_task_creation() {
    let h = harness();
    h.registry.register(healthy_service(Capability::Analytics));
    h.coordinator.register_agent(TaskKind::Prediction).unwrap();

    let mut patch = BTreeMap::new();
    patch.insert("student_id".to_string(), json!("s-117"));
    patch.insert("term".to_string(), json!("fall-2026"));

    let outcome = h
        .orchestrator
        .handle(OrchestrateCommand {
            capability: Capability::Analytics,
            payload: json!({
                "report": "risk",
                "followup": {
                    "tasks": [
                        {"kind": "prediction", "priority": "high", "payload": {"model": "risk-v2"}}
                    ]
                }
            }),
            caller: Some(json!({"user": "advisor-9"})),
            priority: TaskPriority::High,
            context_key: Some("session:risk-117".to_string()),
            context_patch: Some(patch),
        })
        .await
        .unwrap();

    // The context landed in the store before the task was created.
    let entry = h.contexts.get("session:risk-117").await.unwrap();
    assert_eq!(entry.payload.get("student_id"), Some(&json!("s-117")));

    let OrchestrationOutcome::Scheduled { response, handle } = outcome else {
        panic!("expected scheduled follow-up work");
    };
    assert!(response.success);

    let task_id = handle.task_id.expect("single spec creates a task");
    assert!(handle.workflow_id.is_none());

    let task = h.coordinator.get_task(task_id).unwrap();
    assert_eq!(task.kind, TaskKind::Prediction);
    assert_eq!(task.priority, TaskPriority::High);
    assert_eq!(task.context_key.as_deref(), Some("session:risk-117"));
    assert_eq!(task.status, TaskStatus::Assigned);

    // The task payload was enriched with the session context.
    let context = task.payload.get("context").expect("payload enriched");
    assert_eq!(context.get("student_id"), Some(&json!("s-117")));
    assert_eq!(context.get("term"), Some(&json!("fall-2026")));
}

#[tokio::test]
async fn multi_task_followup_creates_workflow_and_failure_dominates() {
    let h = harness();
    h.registry
        .register(healthy_service(Capability::Communication));
    let agent = h
        .coordinator
        .register_agent(TaskKind::Notification)
        .unwrap();

    let outcome = h
        .orchestrator
        .handle(command(
            Capability::Communication,
            json!({
                "broadcast": "term-results",
                "followup": {
                    "tasks": [
                        {"kind": "notification", "payload": {"channel": "email"}},
                        {"kind": "notification", "payload": {"channel": "sms"}},
                        {"kind": "notification", "payload": {"channel": "push"}}
                    ]
                }
            }),
        ))
        .await
        .unwrap();

    let OrchestrationOutcome::Scheduled { handle, .. } = outcome else {
        panic!("expected scheduled follow-up work");
    };
    let workflow_id = handle.workflow_id.expect("several specs create a workflow");

    // One agent works the members in order: two succeed, the third fails
    // through both of its attempts.
    let (workflow, tasks) = h.coordinator.get_workflow(workflow_id).unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Running);
    assert_eq!(tasks.len(), 3);

    h.coordinator
        .report_outcome(tasks[0].task_id, agent.agent_id, true, None, None)
        .unwrap();
    h.coordinator
        .report_outcome(tasks[1].task_id, agent.agent_id, true, None, None)
        .unwrap();
    h.coordinator
        .report_outcome(
            tasks[2].task_id,
            agent.agent_id,
            false,
            None,
            Some("smtp down".into()),
        )
        .unwrap();
    h.coordinator
        .report_outcome(
            tasks[2].task_id,
            agent.agent_id,
            false,
            None,
            Some("smtp down".into()),
        )
        .unwrap();

    let (workflow, tasks) = h.coordinator.get_workflow(workflow_id).unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Failed);
    assert_eq!(
        tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count(),
        2
    );
    assert_eq!(
        tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count(),
        1
    );
}

#[tokio::test]
async fn lost_agent_task_is_reassigned_and_late_result_discarded() {
    let h = harness();
    let first = h.coordinator.register_agent(TaskKind::Prediction).unwrap();
    let task = h
        .coordinator
        .create_task(
            switchboard_api::TaskSpec {
                kind: TaskKind::Prediction,
                priority: TaskPriority::Urgent,
                payload: json!({"model": "risk-v2"}),
            },
            None,
        )
        .unwrap();
    assert_eq!(task.assigned_agent_id, Some(first.agent_id));
    h.coordinator
        .start_task(task.task_id, first.agent_id)
        .unwrap();

    let second = h.coordinator.register_agent(TaskKind::Prediction).unwrap();

    // Two missed heartbeat windows later, the sweeper's reclaim runs.
    let later = Utc::now() + chrono::Duration::seconds(31);
    h.coordinator.reclaim_lost_agents(later).unwrap();

    // Both agents were silent; the second one heartbeats back in and takes
    // the reclaimed task without caller intervention.
    h.coordinator.agent_heartbeat(second.agent_id).unwrap();
    let task_now = h.coordinator.get_task(task.task_id).unwrap();
    assert_eq!(task_now.status, TaskStatus::Assigned);
    assert_eq!(task_now.assigned_agent_id, Some(second.agent_id));

    // The original agent's late result is discarded, and the replacement's
    // outcome stands.
    assert!(h
        .coordinator
        .report_outcome(task.task_id, first.agent_id, true, Some(json!(1)), None)
        .is_err());
    let done = h
        .coordinator
        .report_outcome(task.task_id, second.agent_id, true, Some(json!(2)), None)
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.result, Some(json!(2)));
}

#[tokio::test]
async fn router_counters_visible_after_traffic() {
    let h = harness();
    h.registry.register(healthy_service(Capability::Academic));

    for _ in 0..3 {
        h.orchestrator
            .handle(command(Capability::Academic, json!({"q": "roster"})))
            .await
            .unwrap();
    }
    h.orchestrator
        .handle(command(Capability::Resource, json!({"q": "rooms"})))
        .await
        .unwrap_err();

    let stats = h.router.stats_snapshot();
    let academic = stats
        .iter()
        .find(|s| s.capability == Capability::Academic)
        .unwrap();
    assert_eq!(academic.total_requests, 3);
    assert_eq!(academic.total_failures, 0);

    let resource = stats
        .iter()
        .find(|s| s.capability == Capability::Resource)
        .unwrap();
    assert_eq!(resource.total_requests, 1);
    assert_eq!(resource.total_failures, 1);
}
