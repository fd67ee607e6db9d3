//! HTTP error layer.
//!
//! The domain taxonomy in `switchboard-core` knows nothing about HTTP.
//! This module owns the mapping: every `SwitchboardError` variant lands on
//! an [`ErrorCode`], each code owns exactly one status, and the response
//! body is always the same JSON shape. Handlers return `ApiResult<T>` and
//! never construct status codes by hand.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use switchboard_core::{CoordinationError, RegistryError, RouteError, SwitchboardError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Closed set of error categories the API can answer with.
///
/// Wire representation is SCREAMING_SNAKE_CASE so clients can switch on the
/// code without parsing the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ---- 400 ----
    /// Request validation failed
    ValidationFailed,
    /// Request contains invalid input data
    InvalidInput,
    /// Required field is missing from request
    MissingField,
    /// Capability tag is not in the closed set
    UnknownCapability,

    // ---- 404 ----
    /// Requested service does not exist
    ServiceNotFound,
    /// Requested agent does not exist
    AgentNotFound,
    /// Requested task does not exist
    TaskNotFound,
    /// Requested workflow does not exist
    WorkflowNotFound,
    /// Requested context key does not exist (or has expired)
    ContextNotFound,

    // ---- 409 ----
    /// Operation conflicts with current lifecycle state
    StateConflict,
    /// Outcome reported by an agent that no longer holds the task
    StaleOutcome,

    // ---- 5xx ----
    /// No healthy backend is registered for the capability
    NoAvailableService,
    /// Downstream service failed after the internal retry
    ServiceUnavailable,
    /// Downstream call exceeded its timeout
    Timeout,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// The one status this code ever answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::UnknownCapability => StatusCode::BAD_REQUEST,

            ErrorCode::ServiceNotFound
            | ErrorCode::AgentNotFound
            | ErrorCode::TaskNotFound
            | ErrorCode::WorkflowNotFound
            | ErrorCode::ContextNotFound => StatusCode::NOT_FOUND,

            ErrorCode::StateConflict | ErrorCode::StaleOutcome => StatusCode::CONFLICT,

            ErrorCode::NoAvailableService => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fallback message when the caller does not supply one.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::UnknownCapability => "Unknown capability tag",
            ErrorCode::ServiceNotFound => "Service not found",
            ErrorCode::AgentNotFound => "Agent not found",
            ErrorCode::TaskNotFound => "Task not found",
            ErrorCode::WorkflowNotFound => "Workflow not found",
            ErrorCode::ContextNotFound => "Context not found",
            ErrorCode::StateConflict => "Operation conflicts with current state",
            ErrorCode::StaleOutcome => "Task was reassigned; outcome discarded",
            ErrorCode::NoAvailableService => "No healthy service for capability",
            ErrorCode::ServiceUnavailable => "Downstream service unavailable",
            ErrorCode::Timeout => "Downstream call timed out",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// The error body every endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// A code with its stock message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let code = match err {
            RegistryError::NoAvailableService { .. } => ErrorCode::NoAvailableService,
            RegistryError::ServiceNotFound { .. } => ErrorCode::ServiceNotFound,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        let code = match err {
            RouteError::UnknownCapability { .. } => ErrorCode::UnknownCapability,
            RouteError::NoAvailableService { .. } => ErrorCode::NoAvailableService,
            RouteError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            RouteError::Timeout { .. } => ErrorCode::Timeout,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CoordinationError> for ApiError {
    fn from(err: CoordinationError) -> Self {
        let code = match err {
            CoordinationError::AgentNotRegistered { .. } => ErrorCode::AgentNotFound,
            CoordinationError::TaskNotFound { .. } => ErrorCode::TaskNotFound,
            CoordinationError::WorkflowNotFound { .. } => ErrorCode::WorkflowNotFound,
            CoordinationError::InvalidTransition { .. }
            | CoordinationError::EmptyWorkflow
            | CoordinationError::AgentLost { .. } => ErrorCode::StateConflict,
            CoordinationError::StaleOutcome { .. } => ErrorCode::StaleOutcome,
            // The task stays pending; callers poll rather than fail.
            CoordinationError::AssignmentTimeout { .. } => ErrorCode::StateConflict,
            CoordinationError::LockPoisoned => {
                tracing::error!("Coordinator lock poisoned");
                return ApiError::from_code(ErrorCode::InternalError);
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<SwitchboardError> for ApiError {
    fn from(err: SwitchboardError) -> Self {
        match err {
            SwitchboardError::Registry(e) => e.into(),
            SwitchboardError::Route(e) => e.into(),
            SwitchboardError::Coordination(e) => e.into(),
            SwitchboardError::Validation(message) => ApiError::validation_failed(message),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// TESTS
// ============================================================================
