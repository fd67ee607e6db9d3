//! Closed enumerations shared across the Switchboard crates.
//!
//! Every enumeration that crosses a process boundary (HTTP body, stored
//! snapshot) carries `as_db_str`/`from_db_str` alongside `Display` and
//! `FromStr`, so the wire representation is a single closed set checked at
//! the edge instead of stringly-typed dispatch scattered across modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CAPABILITY TAG
// ============================================================================

/// Capability class of a backend tool server.
///
/// This is the routing key: every registered service declares exactly one
/// capability, and every routed request names exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Academic data services (grades, evaluations, transcripts)
    Academic,
    /// Resource management services (rooms, equipment, scheduling)
    Resource,
    /// Communication services (messaging, notifications)
    Communication,
    /// Analytics services (reporting, aggregation)
    Analytics,
}

impl Capability {
    /// All capability tags, in a stable order.
    pub const ALL: [Capability; 4] = [
        Capability::Academic,
        Capability::Resource,
        Capability::Communication,
        Capability::Analytics,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Capability::Academic => "academic",
            Capability::Resource => "resource",
            Capability::Communication => "communication",
            Capability::Analytics => "analytics",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, CapabilityParseError> {
        match s.to_lowercase().as_str() {
            "academic" => Ok(Capability::Academic),
            "resource" => Ok(Capability::Resource),
            "communication" => Ok(Capability::Communication),
            "analytics" => Ok(Capability::Analytics),
            _ => Err(CapabilityParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for Capability {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid capability string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityParseError(pub String);

impl fmt::Display for CapabilityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown capability: {}", self.0)
    }
}

impl std::error::Error for CapabilityParseError {}

// ============================================================================
// SERVICE HEALTH STATE
// ============================================================================

/// Health state of a registered backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Not yet heard from since registration
    #[default]
    Unknown,
    /// Fully operational, eligible for routing
    Healthy,
    /// Operational but impaired, excluded from routing
    Degraded,
    /// Not reachable (reported or demoted by the staleness sweep)
    Unreachable,
}

impl HealthState {
    /// Only Healthy entries are routing candidates.
    pub fn is_routable(&self) -> bool {
        matches!(self, HealthState::Healthy)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unreachable => "unreachable",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, HealthStateParseError> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(HealthState::Unknown),
            "healthy" => Ok(HealthState::Healthy),
            "degraded" => Ok(HealthState::Degraded),
            "unreachable" => Ok(HealthState::Unreachable),
            _ => Err(HealthStateParseError(s.to_string())),
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for HealthState {
    type Err = HealthStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid health state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStateParseError(pub String);

impl fmt::Display for HealthStateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid health state: {}", self.0)
    }
}

impl std::error::Error for HealthStateParseError {}

// ============================================================================
// AGENT TYPES
// ============================================================================

/// Kind of work an agent executes. An agent declares exactly one kind and
/// only receives tasks of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Content generation (lesson material, summaries)
    ContentGeneration,
    /// Predictive models (risk scores, forecasts)
    Prediction,
    /// Recommendation engines
    Recommendation,
    /// Outbound notification fan-out
    Notification,
}

impl TaskKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskKind::ContentGeneration => "content_generation",
            TaskKind::Prediction => "prediction",
            TaskKind::Recommendation => "recommendation",
            TaskKind::Notification => "notification",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, TaskKindParseError> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "content_generation" => Ok(TaskKind::ContentGeneration),
            "prediction" => Ok(TaskKind::Prediction),
            "recommendation" => Ok(TaskKind::Recommendation),
            "notification" => Ok(TaskKind::Notification),
            _ => Err(TaskKindParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for TaskKind {
    type Err = TaskKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid task kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskKindParseError(pub String);

impl fmt::Display for TaskKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid task kind: {}", self.0)
    }
}

impl std::error::Error for TaskKindParseError {}

/// Runtime status of a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Available for assignment
    Idle,
    /// Holding a task
    Busy,
    /// Missed its heartbeat deadline; excluded until it re-registers
    Offline,
}

impl AgentStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Busy => "busy",
            AgentStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// TASK PRIORITY AND STATUS
// ============================================================================

/// Priority level for tasks. Declaration order is ascending urgency so the
/// derived `Ord` matches scheduling order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, TaskPriorityParseError> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "normal" => Ok(TaskPriority::Normal),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            _ => Err(TaskPriorityParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for TaskPriority {
    type Err = TaskPriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid task priority string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPriorityParseError(pub String);

impl fmt::Display for TaskPriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid task priority: {}", self.0)
    }
}

impl std::error::Error for TaskPriorityParseError {}

/// Lifecycle status of a task.
///
/// ```text
/// Pending ──→ Assigned ──→ Running ──→ Completed
///    │  ↑        │            │
///    │  │        │            └──→ Failed ──(attempts left)──→ Pending
///    │  └────────┴── reclaim / retry
///    └──→ Cancelled (also reachable from Assigned, never from Running)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether a transition to `next` is legal.
    ///
    /// `Failed → Pending` is the retry re-entry; `Assigned → Pending` and
    /// `Running → Pending` are the reclaim paths when an agent is lost.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (*self, next),
            (Pending, Assigned)
                | (Pending, Cancelled)
                | (Assigned, Running)
                | (Assigned, Pending)
                | (Assigned, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Pending)
                | (Failed, Pending)
        )
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// WORKFLOW STATUS
// ============================================================================

/// Aggregate status of a workflow, derived from its member tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// No member task has started yet
    Pending,
    /// At least one member is in flight
    Running,
    /// Every member completed
    Completed,
    /// At least one member exhausted its retries
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
