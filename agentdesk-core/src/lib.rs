//! agentdesk core - data types and seams
//!
//! Pure data structures, the error taxonomy and the traits at the two external
//! seams (backend data API, planning service). No orchestration lives here.

use chrono::{DateTime, Utc};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Backend client identifier.
pub type ClientId = i64;

/// Backend task identifier.
pub type TaskId = i64;

/// Backend policy identifier.
pub type PolicyId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Monotonic tag of one aggregation/planning cycle.
pub type Generation = u64;

// ============================================================================
// MODULES
// ============================================================================

pub mod action;
pub mod backend;
pub mod context;
pub mod error;
pub mod llm;
pub mod outcome;
pub mod plan;
pub mod records;

pub use action::{ActionKey, ActionPhase, ActionState};
pub use backend::{CredentialStore, Credentials, DashboardBackend, StaticCredentialStore};
pub use context::{
    AgentContext, AggregationContext, ClientDetail, CommunicationSummary, PendingTaskRef,
    PolicySummary, TaskSummary,
};
pub use error::{
    ActionSubmissionError, AuthenticationError, ContextIncompleteError, DeskError, FetchErrorKind,
    PlanGenerationError, ProviderError, SourceFetchError,
};
pub use llm::{PlanningProvider, PlanningRequest, PlanningResponse};
pub use outcome::{AggregationResult, SourceKind, SourceOutcome};
pub use plan::{ClientInteraction, DayPlan, WeeklyPlan, EMPTY_ROSTER_GOAL, MAX_PLAN_DAYS};
pub use records::{
    decimal_to_f64, ActivityItem, AgentGoalRecord, BackendErrorBody, ClientRecord,
    CommunicationRecord, CreateTaskRequest, CreatedTask, DashboardMetrics, DecimalValue,
    MonthlySales, PendingTask, PolicyRecord, TaskRecord,
};
