//! REST client for the backend data API.

use crate::config::ConsoleConfig;
use agentdesk_core::{
    ActionSubmissionError, ActivityItem, AgentGoalRecord, AuthenticationError, BackendErrorBody,
    ClientRecord, CreateTaskRequest, CreatedTask, CredentialStore, Credentials, DashboardBackend,
    DashboardMetrics, FetchErrorKind, MonthlySales, PendingTask, SourceFetchError, SourceKind,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const METRICS_PATH: &str = "/api/dashboard/metrics";
pub const PENDING_TASKS_PATH: &str = "/api/tasks/pending";
pub const ACTIVITY_FEED_PATH: &str = "/api/dashboard/activity";
pub const AGENT_GOAL_PATH: &str = "/api/agent/goal";
pub const CLIENT_ROSTER_PATH: &str = "/api/clients/roster";
pub const SALES_PERFORMANCE_PATH: &str = "/api/dashboard/sales-performance";
pub const TASKS_PATH: &str = "/api/tasks";

/// Backend path serving `source`.
pub fn source_path(source: SourceKind) -> &'static str {
    match source {
        SourceKind::Metrics => METRICS_PATH,
        SourceKind::PendingTasks => PENDING_TASKS_PATH,
        SourceKind::ActivityFeed => ACTIVITY_FEED_PATH,
        SourceKind::AgentGoal => AGENT_GOAL_PATH,
        SourceKind::ClientRoster => CLIENT_ROSTER_PATH,
        SourceKind::SalesPerformance => SALES_PERFORMANCE_PATH,
    }
}

/// Render a non-2xx body: a JSON `{ "error": ... }` is surfaced verbatim,
/// anything else as `HTTP <code>: <body>`.
pub fn describe_error_body(status: StatusCode, text: &str) -> String {
    match serde_json::from_str::<BackendErrorBody>(text) {
        Ok(body) => body.error,
        Err(_) => format!("HTTP {}: {}", status.as_u16(), text.trim()),
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeout(&config.api_base_url, config.request_timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        source: SourceKind,
        credentials: &Credentials,
    ) -> Result<T, SourceFetchError> {
        let url = format!("{}{}", self.base_url, source_path(source));
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, credentials.authorization_value())
            .send()
            .await
            .map_err(|e| transport_error(source, &e))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                SourceFetchError::new(source, FetchErrorKind::Decode, e.to_string())
            });
        }

        let text = response.text().await.unwrap_or_default();
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchErrorKind::Unauthorized,
            other => FetchErrorKind::Status(other.as_u16()),
        };
        Err(SourceFetchError::new(source, kind, describe_error_body(status, &text)))
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn transport_error(source: SourceKind, error: &reqwest::Error) -> SourceFetchError {
    let kind = if error.is_timeout() {
        FetchErrorKind::Timeout
    } else {
        FetchErrorKind::Transport
    };
    SourceFetchError::new(source, kind, error.to_string())
}

#[async_trait]
impl DashboardBackend for RestClient {
    async fn fetch_metrics(
        &self,
        credentials: &Credentials,
    ) -> Result<DashboardMetrics, SourceFetchError> {
        self.get_json(SourceKind::Metrics, credentials).await
    }

    async fn fetch_pending_tasks(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PendingTask>, SourceFetchError> {
        self.get_json(SourceKind::PendingTasks, credentials).await
    }

    async fn fetch_activity_feed(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ActivityItem>, SourceFetchError> {
        self.get_json(SourceKind::ActivityFeed, credentials).await
    }

    async fn fetch_agent_goal(
        &self,
        credentials: &Credentials,
    ) -> Result<AgentGoalRecord, SourceFetchError> {
        self.get_json(SourceKind::AgentGoal, credentials).await
    }

    async fn fetch_client_roster(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ClientRecord>, SourceFetchError> {
        self.get_json(SourceKind::ClientRoster, credentials).await
    }

    async fn fetch_sales_performance(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<MonthlySales>, SourceFetchError> {
        self.get_json(SourceKind::SalesPerformance, credentials).await
    }

    async fn create_task(
        &self,
        credentials: &Credentials,
        request: &CreateTaskRequest,
    ) -> Result<CreatedTask, ActionSubmissionError> {
        let url = format!("{}{}", self.base_url, TASKS_PATH);
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, credentials.authorization_value())
            .json(request)
            .send()
            .await
            .map_err(|e| ActionSubmissionError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<CreatedTask>()
                .await
                .map_err(|e| ActionSubmissionError::Transport {
                    message: format!("invalid response body: {}", e),
                });
        }

        let text = response.text().await.unwrap_or_default();
        Err(ActionSubmissionError::Rejected {
            status: status.as_u16(),
            message: describe_error_body(status, &text),
        })
    }
}

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Reads the bearer token from an environment variable on every lookup.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    var: String,
}

impl EnvCredentialStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(config.auth.token_env.clone())
    }
}

impl CredentialStore for EnvCredentialStore {
    fn lookup(&self) -> Option<Arc<Credentials>> {
        self.require().ok()
    }

    fn require(&self) -> Result<Arc<Credentials>, AuthenticationError> {
        let token = std::env::var(&self.var).map_err(|_| AuthenticationError::MissingToken)?;
        Credentials::bearer(token).map(Arc::new)
    }
}
