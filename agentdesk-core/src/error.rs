//! Error taxonomy for agentdesk operations

use crate::SourceKind;
use thiserror::Error;

/// Credential errors. Fatal for a refresh cycle: no request is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("No bearer token available in the credential store")]
    MissingToken,

    #[error("Bearer token rejected: {reason}")]
    InvalidToken { reason: String },
}

/// What went wrong while fetching a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Connection, DNS, TLS or body read failure.
    Transport,
    /// Backend answered with a non-success status.
    Status(u16),
    /// Backend answered 401 or 403.
    Unauthorized,
    /// Body was not the JSON shape we expected.
    Decode,
    /// Request exceeded the per-source timeout.
    Timeout,
    /// The worker task panicked or was cancelled.
    Worker,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Transport => write!(f, "transport"),
            FetchErrorKind::Status(code) => write!(f, "status {}", code),
            FetchErrorKind::Unauthorized => write!(f, "unauthorized"),
            FetchErrorKind::Decode => write!(f, "decode"),
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Worker => write!(f, "worker"),
        }
    }
}

/// Per-source fetch failure, recorded in `SourceOutcome::Failed`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{source_kind} unavailable ({kind}): {message}")]
pub struct SourceFetchError {
    pub source_kind: SourceKind,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl SourceFetchError {
    pub fn new(source_kind: SourceKind, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            source_kind,
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(source_kind: SourceKind, timeout_ms: u64) -> Self {
        Self::new(
            source_kind,
            FetchErrorKind::Timeout,
            format!("no response within {}ms", timeout_ms),
        )
    }
}

/// One or both mandatory sources failed; planning is blocked.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContextIncompleteError {
    #[error("Goal data unavailable: the weekly plan needs the agent's income goal")]
    GoalUnavailable,

    #[error("Client data unavailable: the weekly plan needs the client roster")]
    ClientsUnavailable,

    #[error("Goal and client data unavailable: the weekly plan cannot be generated")]
    BothUnavailable,
}

impl ContextIncompleteError {
    /// Classify from the success flags of the two mandatory sources.
    /// Returns `None` when both succeeded.
    pub fn from_flags(goal_ok: bool, clients_ok: bool) -> Option<Self> {
        match (goal_ok, clients_ok) {
            (true, true) => None,
            (false, true) => Some(Self::GoalUnavailable),
            (true, false) => Some(Self::ClientsUnavailable),
            (false, false) => Some(Self::BothUnavailable),
        }
    }

    pub fn missing_sources(&self) -> &'static [SourceKind] {
        match self {
            Self::GoalUnavailable => &[SourceKind::AgentGoal],
            Self::ClientsUnavailable => &[SourceKind::ClientRoster],
            Self::BothUnavailable => &[SourceKind::AgentGoal, SourceKind::ClientRoster],
        }
    }
}

/// Errors raised by a concrete planning provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },
}

/// Planning failed; no partial plan is ever adopted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanGenerationError {
    #[error("Planning service unreachable: {message}")]
    Transport { message: String },

    #[error("Planning service returned status {status}: {message}")]
    Status { status: i32, message: String },

    #[error("Planning service rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: i64 },

    #[error("Planning service did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Planning response violates the weekly plan schema: {reason}")]
    Schema { reason: String },

    #[error("Failed to serialize planning context: {reason}")]
    Serialize { reason: String },
}

impl PlanGenerationError {
    pub fn schema(reason: impl Into<String>) -> Self {
        Self::Schema {
            reason: reason.into(),
        }
    }
}

impl From<ProviderError> for PlanGenerationError {
    fn from(err: ProviderError) -> Self {
        match err {
            // Status 0 marks a failure before any HTTP status was received.
            ProviderError::RequestFailed {
                status: 0, message, ..
            } => Self::Transport { message },
            ProviderError::RequestFailed {
                status, message, ..
            } => Self::Status { status, message },
            ProviderError::RateLimited { retry_after_ms, .. } => {
                Self::RateLimited { retry_after_ms }
            }
            ProviderError::InvalidResponse { reason, .. } => Self::Transport { message: reason },
            ProviderError::InvalidApiKey { provider } => Self::Status {
                status: 401,
                message: format!("{} rejected the API key", provider),
            },
        }
    }
}

/// A single "create task" submission failed. Scoped to its own key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionSubmissionError {
    #[error("Task service unreachable: {message}")]
    Transport { message: String },

    #[error("Task creation rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Task creation did not finish within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Task submission worker stopped: {message}")]
    Worker { message: String },
}

/// Master error type for agentdesk operations.
#[derive(Debug, Clone, Error)]
pub enum DeskError {
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Source error: {0}")]
    Source(#[from] SourceFetchError),

    #[error("Context incomplete: {0}")]
    ContextIncomplete(#[from] ContextIncompleteError),

    #[error("Plan generation error: {0}")]
    Plan(#[from] PlanGenerationError),

    #[error("Action error: {0}")]
    Action(#[from] ActionSubmissionError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

// =============================================================================
// TESTS
// =============================================================================
