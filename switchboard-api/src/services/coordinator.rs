//! Agent Coordinator
//!
//! Maintains the registered agent pool and the task/workflow tables, and
//! assigns tasks to agents by capability match with priority ordering,
//! retries, and lost-agent reclaim.
//!
//! All assignment state lives behind one mutex: the invariant that "mark
//! agent busy" and "mark task assigned" happen as a single atomic step makes
//! the tables share a critical section. Sections are short, in-memory, and
//! never await; poisoning maps to a typed error instead of a panic
//! propagating through handlers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use switchboard_core::{
    Agent, AgentStatus, CoordinationError, CoordinatorConfig, EntityId, Task, TaskKind,
    TaskPriority, TaskStatus, Timestamp, Workflow, WorkflowStatus,
};

// ============================================================================
// PENDING QUEUE
// ============================================================================

/// Priority-ordered wait structure for unassigned tasks.
///
/// One FIFO lane per priority; within a lane, tasks are ordered by
/// `created_at` so a reclaimed task re-enters ahead of younger work instead
/// of losing its place.
#[derive(Debug, Default)]
struct PendingQueue {
    lanes: [VecDeque<(EntityId, Timestamp)>; 4],
}

fn lane_index(priority: TaskPriority) -> usize {
    match priority {
        TaskPriority::Urgent => 0,
        TaskPriority::High => 1,
        TaskPriority::Normal => 2,
        TaskPriority::Low => 3,
    }
}

impl PendingQueue {
    fn push(&mut self, priority: TaskPriority, task_id: EntityId, created_at: Timestamp) {
        let lane = &mut self.lanes[lane_index(priority)];
        let position = lane
            .iter()
            .position(|(_, at)| *at > created_at)
            .unwrap_or(lane.len());
        lane.insert(position, (task_id, created_at));
    }

    fn remove(&mut self, task_id: EntityId) -> bool {
        for lane in self.lanes.iter_mut() {
            if let Some(position) = lane.iter().position(|(id, _)| *id == task_id) {
                lane.remove(position);
                return true;
            }
        }
        false
    }

    /// First pending task of the given kind, scanning priorities from
    /// urgent down and FIFO within each lane.
    fn pop_match(&mut self, kind: TaskKind, tasks: &HashMap<EntityId, Task>) -> Option<EntityId> {
        for lane in self.lanes.iter_mut() {
            let position = lane.iter().position(|(id, _)| {
                tasks
                    .get(id)
                    .map(|t| t.kind == kind && t.status == TaskStatus::Pending)
                    .unwrap_or(false)
            });
            if let Some(position) = position {
                return lane.remove(position).map(|(id, _)| id);
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.lanes.iter().map(|l| l.len()).sum()
    }
}

// ============================================================================
// UTILIZATION SNAPSHOT
// ============================================================================

/// Per-kind agent utilization for /stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct KindUtilization {
    pub kind: TaskKind,
    pub idle: u64,
    pub busy: u64,
    pub offline: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

/// Coordinator-wide counts for /stats and /health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CoordinatorSnapshot {
    pub agents: u64,
    pub pending_tasks: u64,
    pub active_tasks: u64,
    pub workflows: u64,
    pub utilization: Vec<KindUtilization>,
}

/// Specification of one task inside a create-task or create-workflow call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskSpec {
    pub kind: TaskKind,
    #[serde(default)]
    pub priority: TaskPriority,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: serde_json::Value,
}

// ============================================================================
// COORDINATOR
// ============================================================================

#[derive(Debug, Default)]
struct CoordinatorInner {
    agents: HashMap<EntityId, Agent>,
    tasks: HashMap<EntityId, Task>,
    workflows: HashMap<EntityId, Workflow>,
    pending: PendingQueue,
}

/// The agent coordinator. One instance per hosting process.
#[derive(Debug)]
pub struct AgentCoordinator {
    inner: Mutex<CoordinatorInner>,
    config: CoordinatorConfig,
}

impl AgentCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            inner: Mutex::new(CoordinatorInner::default()),
            config,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CoordinatorInner>, CoordinationError> {
        self.inner.lock().map_err(|_| CoordinationError::LockPoisoned)
    }

    // ========================================================================
    // Agents
    // ========================================================================

    /// Register a new agent in Idle status and immediately hand it pending
    /// work of its kind, if any.
    pub fn register_agent(&self, kind: TaskKind) -> Result<Agent, CoordinationError> {
        let mut inner = self.lock()?;
        let agent = Agent::new(kind);
        let agent_id = agent.agent_id;
        inner.agents.insert(agent_id, agent);
        tracing::info!(agent_id = %agent_id, kind = %kind, "Agent registered");

        dispatch_to_agent(&mut inner, agent_id);
        Ok(inner.agents[&agent_id].clone())
    }

    /// Refresh an agent's liveness. An Offline agent that heartbeats again
    /// is readmitted as Idle; an Idle heartbeat also drains the queue.
    pub fn agent_heartbeat(&self, agent_id: EntityId) -> Result<Agent, CoordinationError> {
        let mut inner = self.lock()?;
        let agent = inner
            .agents
            .get_mut(&agent_id)
            .ok_or(CoordinationError::AgentNotRegistered { agent_id })?;
        agent.last_heartbeat_at = Utc::now();
        if agent.status == AgentStatus::Offline {
            agent.status = AgentStatus::Idle;
            agent.current_task_id = None;
            tracing::info!(agent_id = %agent_id, "Offline agent readmitted");
        }
        if agent.status == AgentStatus::Idle {
            dispatch_to_agent(&mut inner, agent_id);
        }
        Ok(inner.agents[&agent_id].clone())
    }

    pub fn get_agent(&self, agent_id: EntityId) -> Result<Agent, CoordinationError> {
        let inner = self.lock()?;
        inner
            .agents
            .get(&agent_id)
            .cloned()
            .ok_or(CoordinationError::AgentNotRegistered { agent_id })
    }

    pub fn agents_snapshot(&self) -> Result<Vec<Agent>, CoordinationError> {
        let inner = self.lock()?;
        let mut agents: Vec<Agent> = inner.agents.values().cloned().collect();
        agents.sort_by_key(|a| a.agent_id);
        Ok(agents)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// Insert a Pending task and immediately attempt assignment.
    pub fn create_task(
        &self,
        spec: TaskSpec,
        context_key: Option<String>,
    ) -> Result<Task, CoordinationError> {
        let mut inner = self.lock()?;
        let task_id = admit_task(&mut inner, spec, context_key, None, self.config.max_task_attempts);
        try_assign(&mut inner, task_id);
        Ok(inner.tasks[&task_id].clone())
    }

    pub fn get_task(&self, task_id: EntityId) -> Result<Task, CoordinationError> {
        let inner = self.lock()?;
        inner
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(CoordinationError::TaskNotFound { task_id })
    }

    /// Assigned → Running, reported by the agent when it picks the work up.
    pub fn start_task(
        &self,
        task_id: EntityId,
        agent_id: EntityId,
    ) -> Result<Task, CoordinationError> {
        let mut inner = self.lock()?;
        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or(CoordinationError::TaskNotFound { task_id })?;
        if task.assigned_agent_id != Some(agent_id) {
            return Err(CoordinationError::StaleOutcome { task_id, agent_id });
        }
        if !task.status.can_transition_to(TaskStatus::Running) {
            return Err(CoordinationError::InvalidTransition {
                task_id,
                from: task.status,
                to: TaskStatus::Running,
            });
        }
        task.status = TaskStatus::Running;
        Ok(task.clone())
    }

    /// Running (or Assigned: agents may skip the explicit start) →
    /// Completed or Failed-with-retry.
    ///
    /// An outcome from an agent that no longer holds the task is discarded:
    /// after a heartbeat-loss reclaim the first accepted outcome wins.
    pub fn report_outcome(
        &self,
        task_id: EntityId,
        agent_id: EntityId,
        success: bool,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<Task, CoordinationError> {
        let mut inner = self.lock()?;

        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or(CoordinationError::TaskNotFound { task_id })?;
        if task.assigned_agent_id != Some(agent_id) {
            return Err(CoordinationError::StaleOutcome { task_id, agent_id });
        }
        if !matches!(task.status, TaskStatus::Assigned | TaskStatus::Running) {
            return Err(CoordinationError::InvalidTransition {
                task_id,
                from: task.status,
                to: if success {
                    TaskStatus::Completed
                } else {
                    TaskStatus::Failed
                },
            });
        }

        let now = Utc::now();
        task.assigned_agent_id = None;
        let (priority, created_at, workflow_id) = (task.priority, task.created_at, task.workflow_id);

        let requeue = if success {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now);
            task.result = result;
            false
        } else {
            task.attempts += 1;
            task.last_error = error;
            if task.has_attempts_left() {
                task.status = TaskStatus::Pending;
                tracing::info!(
                    task_id = %task_id,
                    attempts = task.attempts,
                    max_attempts = task.max_attempts,
                    "Task failed, re-queueing"
                );
                true
            } else {
                task.status = TaskStatus::Failed;
                task.completed_at = Some(now);
                tracing::warn!(task_id = %task_id, "Task failed terminally");
                false
            }
        };
        let final_status = inner.tasks[&task_id].status;

        if requeue {
            inner.pending.push(priority, task_id, created_at);
        }

        // Free the agent and book-keep its counters.
        if let Some(agent) = inner.agents.get_mut(&agent_id) {
            agent.status = AgentStatus::Idle;
            agent.current_task_id = None;
            if final_status == TaskStatus::Completed {
                agent.tasks_completed += 1;
            } else {
                agent.tasks_failed += 1;
            }
        }

        if let Some(workflow_id) = workflow_id {
            refresh_workflow(&mut inner, workflow_id);
        }

        // The newly idle agent takes the next matching pending task, which
        // may be the one just re-queued.
        dispatch_to_agent(&mut inner, agent_id);

        Ok(inner.tasks[&task_id].clone())
    }

    /// Cancel a Pending or Assigned task. Running work is never interrupted.
    pub fn cancel_task(&self, task_id: EntityId) -> Result<Task, CoordinationError> {
        let mut inner = self.lock()?;
        let freed_agent = cancel_member(&mut inner, task_id)?;
        if let Some(workflow_id) = inner.tasks[&task_id].workflow_id {
            refresh_workflow(&mut inner, workflow_id);
        }
        if let Some(agent_id) = freed_agent {
            dispatch_to_agent(&mut inner, agent_id);
        }
        Ok(inner.tasks[&task_id].clone())
    }

    /// Poll until the task leaves Pending or the bound elapses.
    ///
    /// The task stays admitted either way; `AssignmentTimeout` tells the
    /// caller to poll rather than treat the situation as fatal.
    pub async fn await_assignment(
        &self,
        task_id: EntityId,
        bound: Duration,
    ) -> Result<Task, CoordinationError> {
        let deadline = tokio::time::Instant::now() + bound;
        loop {
            let task = self.get_task(task_id)?;
            if task.status != TaskStatus::Pending {
                return Ok(task);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(CoordinationError::AssignmentTimeout { task_id });
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    // ========================================================================
    // Workflows
    // ========================================================================

    /// Create all member tasks atomically: either every spec is admitted or
    /// none are. Assignment is attempted for each member in order.
    pub fn create_workflow(
        &self,
        specs: Vec<TaskSpec>,
        context_key: Option<String>,
    ) -> Result<(Workflow, Vec<Task>), CoordinationError> {
        if specs.is_empty() {
            return Err(CoordinationError::EmptyWorkflow);
        }
        let mut inner = self.lock()?;

        let workflow = Workflow::new(Vec::with_capacity(specs.len()));
        let workflow_id = workflow.workflow_id;
        inner.workflows.insert(workflow_id, workflow);

        let mut task_ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let task_id = admit_task(
                &mut inner,
                spec,
                context_key.clone(),
                Some(workflow_id),
                self.config.max_task_attempts,
            );
            task_ids.push(task_id);
        }
        if let Some(workflow) = inner.workflows.get_mut(&workflow_id) {
            workflow.task_ids = task_ids.clone();
        }
        tracing::info!(
            workflow_id = %workflow_id,
            tasks = task_ids.len(),
            "Workflow created"
        );

        for task_id in &task_ids {
            try_assign(&mut inner, *task_id);
        }
        refresh_workflow(&mut inner, workflow_id);

        let workflow = inner.workflows[&workflow_id].clone();
        let tasks = task_ids
            .iter()
            .map(|id| inner.tasks[id].clone())
            .collect();
        Ok((workflow, tasks))
    }

    pub fn get_workflow(
        &self,
        workflow_id: EntityId,
    ) -> Result<(Workflow, Vec<Task>), CoordinationError> {
        let inner = self.lock()?;
        let workflow = inner
            .workflows
            .get(&workflow_id)
            .cloned()
            .ok_or(CoordinationError::WorkflowNotFound { workflow_id })?;
        let tasks = workflow
            .task_ids
            .iter()
            .filter_map(|id| inner.tasks.get(id).cloned())
            .collect();
        Ok((workflow, tasks))
    }

    /// Best-effort cancellation: Pending/Assigned members are cancelled,
    /// Running members finish on their agents but cannot resurrect the
    /// workflow's status.
    pub fn cancel_workflow(&self, workflow_id: EntityId) -> Result<Workflow, CoordinationError> {
        let mut inner = self.lock()?;
        let task_ids = inner
            .workflows
            .get(&workflow_id)
            .ok_or(CoordinationError::WorkflowNotFound { workflow_id })?
            .task_ids
            .clone();

        let mut freed = Vec::new();
        for task_id in task_ids {
            let cancellable = inner
                .tasks
                .get(&task_id)
                .map(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Assigned))
                .unwrap_or(false);
            if cancellable {
                if let Ok(Some(agent_id)) = cancel_member(&mut inner, task_id) {
                    freed.push(agent_id);
                }
            }
        }

        if let Some(workflow) = inner.workflows.get_mut(&workflow_id) {
            if !workflow.status.is_terminal() {
                workflow.status = WorkflowStatus::Cancelled;
                workflow.completed_at = Some(Utc::now());
            }
        }

        for agent_id in freed {
            dispatch_to_agent(&mut inner, agent_id);
        }
        Ok(inner.workflows[&workflow_id].clone())
    }

    // ========================================================================
    // Liveness
    // ========================================================================

    /// Mark agents silent past the liveness deadline as Offline and force
    /// their in-flight tasks back to Pending for reassignment.
    ///
    /// This is the only path where the coordinator unilaterally reclaims
    /// work; there is no other liveness signal for a crashed agent.
    pub fn reclaim_lost_agents(&self, now: Timestamp) -> Result<u64, CoordinationError> {
        let deadline = self.config.liveness_deadline();
        let mut inner = self.lock()?;

        let lost: Vec<EntityId> = inner
            .agents
            .values()
            .filter(|a| a.status != AgentStatus::Offline && a.is_lost(now, deadline))
            .map(|a| a.agent_id)
            .collect();

        let mut reclaimed_tasks = Vec::new();
        for agent_id in &lost {
            let Some(agent) = inner.agents.get_mut(agent_id) else {
                continue;
            };
            let held = agent.current_task_id.take();
            agent.status = AgentStatus::Offline;
            tracing::warn!(agent_id = %agent_id, held_task = ?held, "Agent lost, marking offline");

            if let Some(task_id) = held {
                if let Some(task) = inner.tasks.get_mut(&task_id) {
                    if matches!(task.status, TaskStatus::Assigned | TaskStatus::Running) {
                        task.status = TaskStatus::Pending;
                        task.assigned_agent_id = None;
                        inner.pending.push(task.priority, task_id, task.created_at);
                        reclaimed_tasks.push(task_id);
                    }
                }
            }
        }

        // Reassign reclaimed work to whoever is still alive.
        for task_id in &reclaimed_tasks {
            try_assign(&mut inner, *task_id);
        }

        Ok(lost.len() as u64)
    }

    // ========================================================================
    // Observability
    // ========================================================================

    pub fn snapshot(&self) -> Result<CoordinatorSnapshot, CoordinationError> {
        let inner = self.lock()?;

        let mut by_kind: HashMap<TaskKind, KindUtilization> = HashMap::new();
        for agent in inner.agents.values() {
            let entry = by_kind.entry(agent.kind).or_insert_with(|| KindUtilization {
                kind: agent.kind,
                idle: 0,
                busy: 0,
                offline: 0,
                tasks_completed: 0,
                tasks_failed: 0,
            });
            match agent.status {
                AgentStatus::Idle => entry.idle += 1,
                AgentStatus::Busy => entry.busy += 1,
                AgentStatus::Offline => entry.offline += 1,
            }
            entry.tasks_completed += agent.tasks_completed;
            entry.tasks_failed += agent.tasks_failed;
        }
        let mut utilization: Vec<KindUtilization> = by_kind.into_values().collect();
        utilization.sort_by_key(|u| u.kind.as_db_str());

        let active_tasks = inner
            .tasks
            .values()
            .filter(|t| matches!(t.status, TaskStatus::Assigned | TaskStatus::Running))
            .count() as u64;

        Ok(CoordinatorSnapshot {
            agents: inner.agents.len() as u64,
            pending_tasks: inner.pending.len() as u64,
            active_tasks,
            workflows: inner.workflows.len() as u64,
            utilization,
        })
    }
}

// ============================================================================
// INTERNAL TRANSITIONS (all run under the coordinator lock)
// ============================================================================

fn admit_task(
    inner: &mut CoordinatorInner,
    spec: TaskSpec,
    context_key: Option<String>,
    workflow_id: Option<EntityId>,
    max_attempts: u32,
) -> EntityId {
    let mut task = Task::new(spec.kind, spec.priority, spec.payload, max_attempts);
    task.context_key = context_key;
    task.workflow_id = workflow_id;
    let task_id = task.task_id;
    inner.tasks.insert(task_id, task);
    task_id
}

/// Try to assign one Pending task to an idle agent of matching kind.
///
/// Tie-break: the agent with the longest time since its last assignment
/// wins, so work spreads fairly across the pool. Falls back to the pending
/// queue when no agent qualifies.
fn try_assign(inner: &mut CoordinatorInner, task_id: EntityId) {
    let Some(task) = inner.tasks.get(&task_id) else {
        return;
    };
    if task.status != TaskStatus::Pending {
        return;
    }
    let (kind, priority, created_at) = (task.kind, task.priority, task.created_at);

    let chosen = inner
        .agents
        .values()
        .filter(|a| a.status == AgentStatus::Idle && a.kind == kind)
        .min_by_key(|a| (a.last_assigned_at.unwrap_or(a.registered_at), a.agent_id))
        .map(|a| a.agent_id);

    match chosen {
        Some(agent_id) => bind(inner, task_id, agent_id),
        None => inner.pending.push(priority, task_id, created_at),
    }
}

/// Hand the highest-priority matching pending task to a (presumed idle)
/// agent.
fn dispatch_to_agent(inner: &mut CoordinatorInner, agent_id: EntityId) {
    let Some(agent) = inner.agents.get(&agent_id) else {
        return;
    };
    if agent.status != AgentStatus::Idle {
        return;
    }
    let kind = agent.kind;
    if let Some(task_id) = inner.pending.pop_match(kind, &inner.tasks) {
        bind(inner, task_id, agent_id);
    }
}

/// The single atomic step: task → Assigned and agent → Busy together.
fn bind(inner: &mut CoordinatorInner, task_id: EntityId, agent_id: EntityId) {
    let now = Utc::now();
    if let Some(task) = inner.tasks.get_mut(&task_id) {
        task.status = TaskStatus::Assigned;
        task.assigned_agent_id = Some(agent_id);
    }
    if let Some(agent) = inner.agents.get_mut(&agent_id) {
        agent.status = AgentStatus::Busy;
        agent.current_task_id = Some(task_id);
        agent.last_assigned_at = Some(now);
    }
    tracing::debug!(task_id = %task_id, agent_id = %agent_id, "Task assigned");
}

/// Cancel one task; returns the agent freed by an Assigned-state
/// cancellation, if any.
fn cancel_member(
    inner: &mut CoordinatorInner,
    task_id: EntityId,
) -> Result<Option<EntityId>, CoordinationError> {
    let task = inner
        .tasks
        .get_mut(&task_id)
        .ok_or(CoordinationError::TaskNotFound { task_id })?;

    match task.status {
        TaskStatus::Pending => {
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(Utc::now());
            inner.pending.remove(task_id);
            Ok(None)
        }
        TaskStatus::Assigned => {
            let agent_id = task.assigned_agent_id.take();
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(Utc::now());
            if let Some(agent_id) = agent_id {
                if let Some(agent) = inner.agents.get_mut(&agent_id) {
                    agent.status = AgentStatus::Idle;
                    agent.current_task_id = None;
                }
            }
            Ok(agent_id)
        }
        from => Err(CoordinationError::InvalidTransition {
            task_id,
            from,
            to: TaskStatus::Cancelled,
        }),
    }
}

/// Re-derive a workflow's status from its members. No-op once terminal.
fn refresh_workflow(inner: &mut CoordinatorInner, workflow_id: EntityId) {
    let Some(workflow) = inner.workflows.get(&workflow_id) else {
        return;
    };
    if workflow.status.is_terminal() {
        return;
    }
    let statuses: Vec<TaskStatus> = workflow
        .task_ids
        .iter()
        .filter_map(|id| inner.tasks.get(id).map(|t| t.status))
        .collect();
    let derived = Workflow::derive_status(&statuses);

    if let Some(workflow) = inner.workflows.get_mut(&workflow_id) {
        workflow.status = derived;
        if derived.is_terminal() && workflow.completed_at.is_none() {
            workflow.completed_at = Some(Utc::now());
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coordinator() -> AgentCoordinator {
        AgentCoordinator::new(CoordinatorConfig {
            max_task_attempts: 2,
            heartbeat_interval: Duration::from_secs(15),
        })
    }

    fn spec(kind: TaskKind, priority: TaskPriority) -> TaskSpec {
        TaskSpec {
            kind,
            priority,
            payload: json!({"job": "x"}),
        }
    }

    #[test]
    fn test_task_assigned_to_registered_agent() {
        let coordinator = coordinator();
        let agent = coordinator.register_agent(TaskKind::Prediction).unwrap();

        let task = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assigned_agent_id, Some(agent.agent_id));

        let agent = coordinator.get_agent(agent.agent_id).unwrap();
        assert_eq!(agent.status, AgentStatus::Busy);
        assert_eq!(agent.current_task_id, Some(task.task_id));
    }

    #[test]
    fn test_task_waits_without_matching_agent() {
        let coordinator = coordinator();
        coordinator.register_agent(TaskKind::Prediction).unwrap();

        let task = coordinator
            .create_task(spec(TaskKind::Notification, TaskPriority::High), None)
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.assigned_agent_id, None);
    }

    #[test]
    fn test_agent_never_double_assigned() {
        let coordinator = coordinator();
        let agent = coordinator.register_agent(TaskKind::Recommendation).unwrap();

        let first = coordinator
            .create_task(spec(TaskKind::Recommendation, TaskPriority::Normal), None)
            .unwrap();
        let second = coordinator
            .create_task(spec(TaskKind::Recommendation, TaskPriority::Urgent), None)
            .unwrap();

        assert_eq!(first.status, TaskStatus::Assigned);
        assert_eq!(second.status, TaskStatus::Pending);
        let agent = coordinator.get_agent(agent.agent_id).unwrap();
        assert_eq!(agent.current_task_id, Some(first.task_id));
    }

    #[test]
    fn test_priority_beats_fifo() {
        let coordinator = coordinator();
        // No agents yet: both tasks queue.
        let low = coordinator
            .create_task(spec(TaskKind::ContentGeneration, TaskPriority::Low), None)
            .unwrap();
        let high = coordinator
            .create_task(spec(TaskKind::ContentGeneration, TaskPriority::High), None)
            .unwrap();

        let agent = coordinator
            .register_agent(TaskKind::ContentGeneration)
            .unwrap();
        assert_eq!(agent.current_task_id, Some(high.task_id));
        assert_eq!(
            coordinator.get_task(low.task_id).unwrap().status,
            TaskStatus::Pending
        );
        assert_eq!(
            coordinator.get_task(high.task_id).unwrap().status,
            TaskStatus::Assigned
        );
    }

    #[test]
    fn test_fifo_within_priority() {
        let coordinator = coordinator();
        let first = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();
        let _second = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();

        let agent = coordinator.register_agent(TaskKind::Prediction).unwrap();
        assert_eq!(agent.current_task_id, Some(first.task_id));
    }

    #[test]
    fn test_fairness_prefers_longest_idle_agent() {
        let coordinator = coordinator();
        let a = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let b = coordinator.register_agent(TaskKind::Prediction).unwrap();

        // First task goes to one of them; complete it, then the next task
        // must go to the other (it has waited longer since assignment).
        let t1 = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();
        let first_agent = t1.assigned_agent_id.unwrap();
        coordinator
            .report_outcome(t1.task_id, first_agent, true, Some(json!({})), None)
            .unwrap();

        let t2 = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();
        let second_agent = t2.assigned_agent_id.unwrap();
        assert_ne!(first_agent, second_agent);
        assert!(second_agent == a.agent_id || second_agent == b.agent_id);
    }

    #[test]
    fn test_outcome_success_frees_agent_and_takes_next() {
        let coordinator = coordinator();
        let agent = coordinator.register_agent(TaskKind::Notification).unwrap();
        let t1 = coordinator
            .create_task(spec(TaskKind::Notification, TaskPriority::Normal), None)
            .unwrap();
        let t2 = coordinator
            .create_task(spec(TaskKind::Notification, TaskPriority::Normal), None)
            .unwrap();
        assert_eq!(t2.status, TaskStatus::Pending);

        coordinator.start_task(t1.task_id, agent.agent_id).unwrap();
        let done = coordinator
            .report_outcome(t1.task_id, agent.agent_id, true, Some(json!({"n": 3})), None)
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());

        // The agent immediately picked up the queued task.
        let t2 = coordinator.get_task(t2.task_id).unwrap();
        assert_eq!(t2.status, TaskStatus::Assigned);
        assert_eq!(t2.assigned_agent_id, Some(agent.agent_id));
    }

    #[test]
    fn test_failure_requeues_until_attempts_exhausted() {
        let coordinator = coordinator(); // max_task_attempts = 2
        let agent = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let task = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();

        // First failure: re-queued, then re-assigned to the same idle agent.
        let after_first = coordinator
            .report_outcome(task.task_id, agent.agent_id, false, None, Some("boom".into()))
            .unwrap();
        assert_eq!(after_first.attempts, 1);

        let requeued = coordinator.get_task(task.task_id).unwrap();
        assert_eq!(requeued.status, TaskStatus::Assigned);

        // Second failure exhausts the budget.
        let after_second = coordinator
            .report_outcome(task.task_id, agent.agent_id, false, None, Some("boom".into()))
            .unwrap();
        assert_eq!(after_second.status, TaskStatus::Failed);
        assert_eq!(after_second.attempts, 2);
        assert_eq!(after_second.last_error.as_deref(), Some("boom"));

        let agent = coordinator.get_agent(agent.agent_id).unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.tasks_failed, 2);
    }

    #[test]
    fn test_stale_outcome_discarded() {
        let coordinator = coordinator();
        let agent = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let task = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();

        let stranger = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let err = coordinator
            .report_outcome(task.task_id, stranger.agent_id, true, None, None)
            .unwrap_err();
        assert_eq!(
            err,
            CoordinationError::StaleOutcome {
                task_id: task.task_id,
                agent_id: stranger.agent_id,
            }
        );
        // The rightful holder can still report.
        assert!(coordinator
            .report_outcome(task.task_id, agent.agent_id, true, None, None)
            .is_ok());
    }

    #[test]
    fn test_cancel_rules() {
        let coordinator = coordinator();
        let pending = coordinator
            .create_task(spec(TaskKind::Notification, TaskPriority::Low), None)
            .unwrap();
        let cancelled = coordinator.cancel_task(pending.task_id).unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        let agent = coordinator.register_agent(TaskKind::Notification).unwrap();
        let assigned = coordinator
            .create_task(spec(TaskKind::Notification, TaskPriority::Low), None)
            .unwrap();
        assert_eq!(assigned.status, TaskStatus::Assigned);
        coordinator.cancel_task(assigned.task_id).unwrap();
        // The agent was freed.
        assert_eq!(
            coordinator.get_agent(agent.agent_id).unwrap().status,
            AgentStatus::Idle
        );

        // Running tasks cannot be cancelled in place.
        let running = coordinator
            .create_task(spec(TaskKind::Notification, TaskPriority::Low), None)
            .unwrap();
        coordinator
            .start_task(running.task_id, agent.agent_id)
            .unwrap();
        let err = coordinator.cancel_task(running.task_id).unwrap_err();
        assert!(matches!(err, CoordinationError::InvalidTransition { .. }));
    }

    #[test]
    fn test_workflow_all_or_nothing_and_derivation() {
        let coordinator = coordinator();
        assert_eq!(
            coordinator.create_workflow(vec![], None).unwrap_err(),
            CoordinationError::EmptyWorkflow
        );

        let agent = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let (workflow, tasks) = coordinator
            .create_workflow(
                vec![
                    spec(TaskKind::Prediction, TaskPriority::Normal),
                    spec(TaskKind::Prediction, TaskPriority::Normal),
                    spec(TaskKind::Prediction, TaskPriority::Normal),
                ],
                None,
            )
            .unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(workflow.status, WorkflowStatus::Running);

        // With a single agent the members run in admission order: complete
        // the first two, then fail the third until its retries exhaust.
        coordinator
            .report_outcome(tasks[0].task_id, agent.agent_id, true, None, None)
            .unwrap();
        coordinator
            .report_outcome(tasks[1].task_id, agent.agent_id, true, None, None)
            .unwrap();
        // First failure re-queues and re-assigns; second is terminal.
        coordinator
            .report_outcome(tasks[2].task_id, agent.agent_id, false, None, Some("bad".into()))
            .unwrap();
        let third = coordinator
            .report_outcome(tasks[2].task_id, agent.agent_id, false, None, Some("bad".into()))
            .unwrap();
        assert_eq!(third.status, TaskStatus::Failed);

        let (workflow, members) = coordinator.get_workflow(workflow.workflow_id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Failed);
        assert!(workflow.completed_at.is_some());
        assert_eq!(
            members
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
            2
        );
        assert_eq!(
            members
                .iter()
                .filter(|t| t.status == TaskStatus::Failed)
                .count(),
            1
        );
    }

    #[test]
    fn test_workflow_cancellation_is_cooperative() {
        let coordinator = coordinator();
        let agent = coordinator.register_agent(TaskKind::Recommendation).unwrap();
        let (workflow, tasks) = coordinator
            .create_workflow(
                vec![
                    spec(TaskKind::Recommendation, TaskPriority::Normal),
                    spec(TaskKind::Recommendation, TaskPriority::Normal),
                ],
                None,
            )
            .unwrap();

        // First member is assigned and started; second queues.
        let running = tasks[0].task_id;
        coordinator.start_task(running, agent.agent_id).unwrap();

        let cancelled = coordinator.cancel_workflow(workflow.workflow_id).unwrap();
        assert_eq!(cancelled.status, WorkflowStatus::Cancelled);

        // The queued member was cancelled; the running one was not touched.
        assert_eq!(
            coordinator.get_task(tasks[1].task_id).unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            coordinator.get_task(running).unwrap().status,
            TaskStatus::Running
        );

        // The running member still completes, but the workflow stays
        // cancelled.
        coordinator
            .report_outcome(running, agent.agent_id, true, None, None)
            .unwrap();
        let (workflow, _) = coordinator.get_workflow(workflow.workflow_id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Cancelled);
    }

    #[test]
    fn test_member_cancel_rederives_workflow() {
        let coordinator = coordinator();
        let agent = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let (workflow, tasks) = coordinator
            .create_workflow(
                vec![
                    spec(TaskKind::Prediction, TaskPriority::Normal),
                    spec(TaskKind::Prediction, TaskPriority::Normal),
                ],
                None,
            )
            .unwrap();

        // Cancel the queued member, then complete the assigned one: every
        // member is settled but not all completed.
        coordinator.cancel_task(tasks[1].task_id).unwrap();
        coordinator
            .report_outcome(tasks[0].task_id, agent.agent_id, true, None, None)
            .unwrap();

        let (workflow, _) = coordinator.get_workflow(workflow.workflow_id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Cancelled);
        assert!(workflow.completed_at.is_some());
    }

    #[test]
    fn test_lost_agent_reclaim_and_reassignment() {
        let coordinator = coordinator(); // heartbeat 15s, deadline 30s
        let lost = coordinator.register_agent(TaskKind::Prediction).unwrap();
        let task = coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::High), None)
            .unwrap();
        coordinator.start_task(task.task_id, lost.agent_id).unwrap();

        let backup = coordinator.register_agent(TaskKind::Prediction).unwrap();

        // Two heartbeat windows pass with nobody heartbeating: both agents
        // are reclaimed and the in-flight task is forced back to Pending.
        let future = Utc::now() + chrono::Duration::seconds(31);
        assert_eq!(coordinator.reclaim_lost_agents(future).unwrap(), 2);
        assert_eq!(
            coordinator.get_task(task.task_id).unwrap().status,
            TaskStatus::Pending
        );
        assert_eq!(
            coordinator.get_agent(lost.agent_id).unwrap().status,
            AgentStatus::Offline
        );

        // The backup comes back: it is readmitted and immediately handed
        // the reclaimed task.
        coordinator.agent_heartbeat(backup.agent_id).unwrap();
        let task_now = coordinator.get_task(task.task_id).unwrap();
        assert_eq!(task_now.status, TaskStatus::Assigned);
        assert_eq!(task_now.assigned_agent_id, Some(backup.agent_id));

        // A late report from the lost agent is discarded.
        let err = coordinator
            .report_outcome(task.task_id, lost.agent_id, true, None, None)
            .unwrap_err();
        assert!(matches!(err, CoordinationError::StaleOutcome { .. }));
    }

    #[tokio::test]
    async fn test_await_assignment_times_out_while_pending() {
        let coordinator = coordinator();
        let task = coordinator
            .create_task(spec(TaskKind::ContentGeneration, TaskPriority::Normal), None)
            .unwrap();

        let err = coordinator
            .await_assignment(task.task_id, Duration::from_millis(60))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoordinationError::AssignmentTimeout {
                task_id: task.task_id
            }
        );
        // The task is still admitted and waiting.
        assert_eq!(
            coordinator.get_task(task.task_id).unwrap().status,
            TaskStatus::Pending
        );
    }

    #[test]
    fn test_snapshot_utilization() {
        let coordinator = coordinator();
        coordinator.register_agent(TaskKind::Prediction).unwrap();
        coordinator.register_agent(TaskKind::Prediction).unwrap();
        coordinator.register_agent(TaskKind::Notification).unwrap();
        coordinator
            .create_task(spec(TaskKind::Prediction, TaskPriority::Normal), None)
            .unwrap();

        let snapshot = coordinator.snapshot().unwrap();
        assert_eq!(snapshot.agents, 3);
        assert_eq!(snapshot.active_tasks, 1);

        let prediction = snapshot
            .utilization
            .iter()
            .find(|u| u.kind == TaskKind::Prediction)
            .unwrap();
        assert_eq!(prediction.busy, 1);
        assert_eq!(prediction.idle, 1);
    }
}
