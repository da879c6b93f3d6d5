//! Backend data API seam and credential passing.
//!
//! The credential is always passed explicitly into every call. Nothing in the
//! core reads tokens from ambient storage.

use crate::error::{ActionSubmissionError, AuthenticationError, SourceFetchError};
use crate::records::{
    ActivityItem, AgentGoalRecord, ClientRecord, CreateTaskRequest, CreatedTask, DashboardMetrics,
    MonthlySales, PendingTask,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Read-only bearer credential shared by all fetches of a cycle.
pub struct Credentials {
    token: SecretString,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Result<Self, AuthenticationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthenticationError::InvalidToken {
                reason: "token is empty".to_string(),
            });
        }
        Ok(Self {
            token: SecretString::from(token),
        })
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.token())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Read-only lookup of the bearer token.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self) -> Option<Arc<Credentials>>;

    /// Lookup that treats absence as the fatal precondition it is.
    fn require(&self) -> Result<Arc<Credentials>, AuthenticationError> {
        self.lookup().ok_or(AuthenticationError::MissingToken)
    }
}

/// Credential store holding a fixed token (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    credentials: Option<Arc<Credentials>>,
}

impl StaticCredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(Arc::new(credentials)),
        }
    }

    pub fn empty() -> Self {
        Self { credentials: None }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn lookup(&self) -> Option<Arc<Credentials>> {
        self.credentials.clone()
    }
}

/// The backend data API consumed by the dashboard.
///
/// Reads never panic past this boundary: every failure is a
/// `SourceFetchError` tagged with its source.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    async fn fetch_metrics(&self, credentials: &Credentials)
        -> Result<DashboardMetrics, SourceFetchError>;

    async fn fetch_pending_tasks(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PendingTask>, SourceFetchError>;

    async fn fetch_activity_feed(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ActivityItem>, SourceFetchError>;

    async fn fetch_agent_goal(
        &self,
        credentials: &Credentials,
    ) -> Result<AgentGoalRecord, SourceFetchError>;

    async fn fetch_client_roster(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ClientRecord>, SourceFetchError>;

    async fn fetch_sales_performance(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<MonthlySales>, SourceFetchError>;

    async fn create_task(
        &self,
        credentials: &Credentials,
        request: &CreateTaskRequest,
    ) -> Result<CreatedTask, ActionSubmissionError>;
}
