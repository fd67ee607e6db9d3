//! Entity types owned by the Switchboard components.
//!
//! Each entity is owned by exactly one component (registry, context store,
//! coordinator); everything else works on snapshot copies.

use crate::{
    AgentStatus, Capability, EntityId, HealthState, TaskKind, TaskPriority, TaskStatus, Timestamp,
    WorkflowStatus,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// SERVICE ENTRY
// ============================================================================

/// A registered backend tool server.
///
/// Created on registration, mutated only by heartbeat processing, removed on
/// deregistration or demoted by the staleness sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ServiceEntry {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub service_id: EntityId,
    pub capability: Capability,
    /// Base URL the router forwards payloads to.
    pub base_address: String,
    pub health: HealthState,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub registered_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub last_heartbeat_at: Option<Timestamp>,
}

impl ServiceEntry {
    pub fn new(service_id: EntityId, capability: Capability, base_address: String) -> Self {
        Self {
            service_id,
            capability,
            base_address,
            health: HealthState::Unknown,
            registered_at: Utc::now(),
            last_heartbeat_at: None,
        }
    }

    /// Whether the entry has been silent longer than `window`.
    ///
    /// An entry that never heartbeated is measured from registration.
    pub fn is_stale(&self, now: Timestamp, window: Duration) -> bool {
        let last_seen = self.last_heartbeat_at.unwrap_or(self.registered_at);
        match (now - last_seen).to_std() {
            Ok(elapsed) => elapsed > window,
            Err(_) => false, // last_seen in the future; clock skew, not staleness
        }
    }
}

// ============================================================================
// ROUTED REQUEST / RESPONSE
// ============================================================================

/// A single request consumed once by the router. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RoutedRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub request_id: EntityId,
    pub capability: Capability,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: serde_json::Value,
    /// Opaque caller identity/context, owned by the caller and forwarded verbatim.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub caller: Option<serde_json::Value>,
    pub priority: TaskPriority,
}

impl RoutedRequest {
    pub fn new(capability: Capability, payload: serde_json::Value) -> Self {
        Self {
            request_id: crate::new_entity_id(),
            capability,
            payload,
            caller: None,
            priority: TaskPriority::default(),
        }
    }

    pub fn with_caller(mut self, caller: serde_json::Value) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// The single response produced for a [`RoutedRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RoutedResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub request_id: EntityId,
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub result: Option<serde_json::Value>,
    /// Error classification when `success` is false.
    pub error_kind: Option<String>,
    /// Which registered service produced this response.
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub service_id: EntityId,
    pub processing_time_ms: u64,
}

// ============================================================================
// CONTEXT ENTRY
// ============================================================================

/// A TTL-bounded context blob scoped to one logical session/request chain.
///
/// Owned exclusively by the context store; callers always receive copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContextEntry {
    pub key: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: BTreeMap<String, serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub expires_at: Timestamp,
    /// Bumped on every write; lets callers detect concurrent updates.
    pub version: u64,
}

impl ContextEntry {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Remaining lifetime, `None` once expired.
    pub fn remaining_ttl(&self, now: Timestamp) -> Option<Duration> {
        if now >= self.expires_at {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// A registered worker able to execute tasks of one declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Agent {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub agent_id: EntityId,
    pub kind: TaskKind,
    pub status: AgentStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub current_task_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub registered_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_heartbeat_at: Timestamp,
    /// When this agent last received an assignment; drives the fairness
    /// tie-break (longest-idle wins).
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub last_assigned_at: Option<Timestamp>,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

impl Agent {
    pub fn new(kind: TaskKind) -> Self {
        let now = Utc::now();
        Self {
            agent_id: crate::new_entity_id(),
            kind,
            status: AgentStatus::Idle,
            current_task_id: None,
            registered_at: now,
            last_heartbeat_at: now,
            last_assigned_at: None,
            tasks_completed: 0,
            tasks_failed: 0,
        }
    }

    /// Whether the agent has been silent longer than `deadline`.
    pub fn is_lost(&self, now: Timestamp, deadline: Duration) -> bool {
        match (now - self.last_heartbeat_at).to_std() {
            Ok(elapsed) => elapsed > deadline,
            Err(_) => false,
        }
    }
}

// ============================================================================
// TASK
// ============================================================================

/// A unit of work coordinated across the agent pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub task_id: EntityId,
    pub kind: TaskKind,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: serde_json::Value,
    /// Context key this task was enriched from, if any.
    pub context_key: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub assigned_agent_id: Option<EntityId>,
    pub attempts: u32,
    pub max_attempts: u32,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub workflow_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub result: Option<serde_json::Value>,
    pub last_error: Option<String>,
}

impl Task {
    pub fn new(
        kind: TaskKind,
        priority: TaskPriority,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> Self {
        Self {
            task_id: crate::new_entity_id(),
            kind,
            priority,
            status: TaskStatus::Pending,
            payload,
            context_key: None,
            assigned_agent_id: None,
            attempts: 0,
            max_attempts,
            workflow_id: None,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            last_error: None,
        }
    }

    /// Whether a failed attempt may re-enter the queue.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

// ============================================================================
// WORKFLOW
// ============================================================================

/// An ordered group of tasks whose aggregate status derives from its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Workflow {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub workflow_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub task_ids: Vec<EntityId>,
    pub status: WorkflowStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
}

impl Workflow {
    pub fn new(task_ids: Vec<EntityId>) -> Self {
        Self {
            workflow_id: crate::new_entity_id(),
            task_ids,
            status: WorkflowStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Derive the aggregate status from member task statuses.
    ///
    /// Failed dominates: one terminally failed member fails the workflow
    /// even while others are still in flight.
    pub fn derive_status(member_statuses: &[TaskStatus]) -> WorkflowStatus {
        if member_statuses.is_empty() {
            return WorkflowStatus::Pending;
        }
        if member_statuses.iter().any(|s| *s == TaskStatus::Failed) {
            return WorkflowStatus::Failed;
        }
        if member_statuses.iter().all(|s| *s == TaskStatus::Completed) {
            return WorkflowStatus::Completed;
        }
        if member_statuses.iter().all(|s| s.is_terminal()) {
            // No failures and not all completed: the rest were cancelled.
            return WorkflowStatus::Cancelled;
        }
        if member_statuses.iter().all(|s| *s == TaskStatus::Pending) {
            return WorkflowStatus::Pending;
        }
        WorkflowStatus::Running
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_service_entry_staleness_from_registration() {
        let entry = ServiceEntry::new(
            crate::new_entity_id(),
            Capability::Academic,
            "http://academic.internal:8080".to_string(),
        );
        let now = Utc::now();
        assert!(!entry.is_stale(now, Duration::from_secs(60)));
        let later = now + ChronoDuration::seconds(120);
        assert!(entry.is_stale(later, Duration::from_secs(60)));
    }

    #[test]
    fn test_service_entry_staleness_uses_last_heartbeat() {
        let mut entry = ServiceEntry::new(
            crate::new_entity_id(),
            Capability::Resource,
            "http://resource.internal:8080".to_string(),
        );
        let now = Utc::now();
        entry.last_heartbeat_at = Some(now);
        assert!(!entry.is_stale(now + ChronoDuration::seconds(30), Duration::from_secs(60)));
        assert!(entry.is_stale(now + ChronoDuration::seconds(90), Duration::from_secs(60)));
    }

    #[test]
    fn test_context_entry_expiry() {
        let now = Utc::now();
        let entry = ContextEntry {
            key: "session:42".to_string(),
            payload: BTreeMap::new(),
            created_at: now,
            expires_at: now + ChronoDuration::seconds(10),
            version: 1,
        };
        assert!(!entry.is_expired(now));
        assert!(entry.remaining_ttl(now).is_some());
        let later = now + ChronoDuration::seconds(10);
        assert!(entry.is_expired(later));
        assert!(entry.remaining_ttl(later).is_none());
    }

    #[test]
    fn test_agent_lost_after_deadline() {
        let mut agent = Agent::new(TaskKind::Prediction);
        let now = Utc::now();
        agent.last_heartbeat_at = now;
        assert!(!agent.is_lost(now + ChronoDuration::seconds(5), Duration::from_secs(30)));
        assert!(agent.is_lost(now + ChronoDuration::seconds(31), Duration::from_secs(30)));
    }

    #[test]
    fn test_task_attempts() {
        let mut task = Task::new(
            TaskKind::Recommendation,
            TaskPriority::Normal,
            serde_json::json!({}),
            3,
        );
        assert!(task.has_attempts_left());
        task.attempts = 3;
        assert!(!task.has_attempts_left());
    }

    #[test]
    fn test_workflow_status_derivation() {
        use TaskStatus::*;
        assert_eq!(Workflow::derive_status(&[]), WorkflowStatus::Pending);
        assert_eq!(
            Workflow::derive_status(&[Pending, Pending]),
            WorkflowStatus::Pending
        );
        assert_eq!(
            Workflow::derive_status(&[Completed, Running, Pending]),
            WorkflowStatus::Running
        );
        assert_eq!(
            Workflow::derive_status(&[Completed, Completed]),
            WorkflowStatus::Completed
        );
        // One terminal failure fails the whole workflow, even mid-flight
        assert_eq!(
            Workflow::derive_status(&[Completed, Failed, Running]),
            WorkflowStatus::Failed
        );
        // All members settled, some by cancellation: the workflow did not
        // complete and did not fail.
        assert_eq!(
            Workflow::derive_status(&[Completed, Cancelled]),
            WorkflowStatus::Cancelled
        );
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Pending),
            Just(TaskStatus::Assigned),
            Just(TaskStatus::Running),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Failed),
            Just(TaskStatus::Cancelled),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// A workflow is Failed exactly when some member is terminally
        /// Failed, and Completed exactly when every member Completed.
        #[test]
        fn prop_workflow_derivation_failed_dominates(
            statuses in prop::collection::vec(arb_task_status(), 1..12)
        ) {
            let derived = Workflow::derive_status(&statuses);
            let any_failed = statuses.iter().any(|s| *s == TaskStatus::Failed);
            let all_completed = statuses.iter().all(|s| *s == TaskStatus::Completed);

            prop_assert_eq!(derived == WorkflowStatus::Failed, any_failed);
            if !any_failed {
                prop_assert_eq!(derived == WorkflowStatus::Completed, all_completed);
            }
        }

        /// A Pending derivation means no member has moved at all.
        #[test]
        fn prop_workflow_pending_means_untouched(
            statuses in prop::collection::vec(arb_task_status(), 1..12)
        ) {
            let derived = Workflow::derive_status(&statuses);
            if derived == WorkflowStatus::Pending {
                prop_assert!(statuses.iter().all(|s| *s == TaskStatus::Pending));
            }
        }
    }
}
