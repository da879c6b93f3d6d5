//! Concurrent fan-out over the six dashboard sources.
//!
//! Every source runs on its own worker task under a per-source timeout. The
//! barrier awaits every handle, so one failure never short-circuits the rest.

use agentdesk_core::{
    AggregationResult, AuthenticationError, Credentials, DashboardBackend, FetchErrorKind,
    Generation, PendingTask, SourceFetchError, SourceKind, SourceOutcome,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

type SourceHandle<T> = JoinHandle<Result<T, SourceFetchError>>;

#[derive(Clone)]
pub struct Aggregator {
    backend: Arc<dyn DashboardBackend>,
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(backend: Arc<dyn DashboardBackend>, source_timeout: Duration) -> Self {
        Self {
            backend,
            source_timeout,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    /// Fetch all six sources concurrently and settle each one independently.
    ///
    /// Fails only when no credential is available, before any request is
    /// issued. Source-level failures are recorded in the result.
    pub async fn run_aggregation(
        &self,
        credentials: Option<Arc<Credentials>>,
        generation: Generation,
    ) -> Result<AggregationResult, AuthenticationError> {
        let credentials = credentials.ok_or(AuthenticationError::MissingToken)?;

        tracing::debug!(generation, "Starting aggregation");

        let metrics = self.spawn_source(
            SourceKind::Metrics,
            &credentials,
            |backend, creds| async move { backend.fetch_metrics(&creds).await },
        );
        let pending_tasks = self.spawn_source(
            SourceKind::PendingTasks,
            &credentials,
            |backend, creds| async move { backend.fetch_pending_tasks(&creds).await },
        );
        let activity_feed = self.spawn_source(
            SourceKind::ActivityFeed,
            &credentials,
            |backend, creds| async move { backend.fetch_activity_feed(&creds).await },
        );
        let agent_goal = self.spawn_source(
            SourceKind::AgentGoal,
            &credentials,
            |backend, creds| async move { backend.fetch_agent_goal(&creds).await },
        );
        let client_roster = self.spawn_source(
            SourceKind::ClientRoster,
            &credentials,
            |backend, creds| async move { backend.fetch_client_roster(&creds).await },
        );
        let sales_performance = self.spawn_source(
            SourceKind::SalesPerformance,
            &credentials,
            |backend, creds| async move { backend.fetch_sales_performance(&creds).await },
        );

        let result = AggregationResult {
            generation,
            metrics: settle(SourceKind::Metrics, metrics, generation).await,
            pending_tasks: settle(SourceKind::PendingTasks, pending_tasks, generation).await,
            activity_feed: settle(SourceKind::ActivityFeed, activity_feed, generation).await,
            agent_goal: settle(SourceKind::AgentGoal, agent_goal, generation).await,
            client_roster: settle(SourceKind::ClientRoster, client_roster, generation).await,
            sales_performance: settle(SourceKind::SalesPerformance, sales_performance, generation)
                .await,
        };

        tracing::info!(
            generation,
            failed = result.failed_sources().len(),
            "Aggregation settled"
        );
        Ok(result)
    }

    /// Refetch only the pending-task slice, with the same timeout and
    /// worker isolation as a full aggregation.
    pub async fn refetch_pending_tasks(
        &self,
        credentials: Arc<Credentials>,
        generation: Generation,
    ) -> SourceOutcome<Vec<PendingTask>> {
        let handle = self.spawn_source(
            SourceKind::PendingTasks,
            &credentials,
            |backend, creds| async move { backend.fetch_pending_tasks(&creds).await },
        );
        settle(SourceKind::PendingTasks, handle, generation).await
    }

    fn spawn_source<T, F, Fut>(
        &self,
        source: SourceKind,
        credentials: &Arc<Credentials>,
        fetch: F,
    ) -> SourceHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn DashboardBackend>, Arc<Credentials>) -> Fut,
        Fut: Future<Output = Result<T, SourceFetchError>> + Send + 'static,
    {
        let timeout = self.source_timeout;
        let fut = fetch(Arc::clone(&self.backend), Arc::clone(credentials));
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(SourceFetchError::timeout(source, timeout.as_millis() as u64)),
            }
        })
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("source_timeout", &self.source_timeout)
            .finish()
    }
}

async fn settle<T>(
    source: SourceKind,
    handle: SourceHandle<T>,
    generation: Generation,
) -> SourceOutcome<T> {
    let result = match handle.await {
        Ok(result) => result,
        Err(join_error) => Err(SourceFetchError::new(
            source,
            FetchErrorKind::Worker,
            describe_join_error(&join_error),
        )),
    };

    if let Err(error) = &result {
        tracing::warn!(
            generation,
            source = %source,
            kind = %error.kind,
            error = %error.message,
            "Source fetch failed"
        );
    }
    SourceOutcome::from(result)
}

fn describe_join_error(error: &JoinError) -> String {
    if error.is_panic() {
        "worker task panicked".to_string()
    } else {
        "worker task was cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_test_utils::{assertions, fixtures, MockBackend};

    fn aggregator(backend: &Arc<MockBackend>) -> Aggregator {
        Aggregator::new(backend.clone(), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_all_sources_succeed() {
        let backend = Arc::new(MockBackend::new());
        let result = aggregator(&backend)
            .run_aggregation(Some(Arc::new(fixtures::credentials())), 1)
            .await
            .unwrap();
        assert!(result.all_succeeded());
        assert_eq!(result.generation, 1);
        assert_eq!(backend.total_fetch_count(), 6);
    }

    #[tokio::test]
    async fn test_missing_credentials_issue_no_requests() {
        let backend = Arc::new(MockBackend::new());
        let err = aggregator(&backend).run_aggregation(None, 1).await.unwrap_err();
        assert_eq!(err, AuthenticationError::MissingToken);
        assert_eq!(backend.total_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_source(SourceKind::Metrics, FetchErrorKind::Status(500));
        let result = aggregator(&backend)
            .run_aggregation(Some(Arc::new(fixtures::credentials())), 2)
            .await
            .unwrap();
        assertions::assert_failed_exactly(&result, &[SourceKind::Metrics]);
        assert_eq!(
            result.first_failure_message().unwrap(),
            "metrics unavailable (status 500): injected failure"
        );
    }

    #[tokio::test]
    async fn test_panicking_worker_becomes_worker_failure() {
        let backend = Arc::new(MockBackend::new());
        backend.panic_source(SourceKind::ActivityFeed);
        let result = aggregator(&backend)
            .run_aggregation(Some(Arc::new(fixtures::credentials())), 3)
            .await
            .unwrap();
        let error = result.error_for(SourceKind::ActivityFeed).unwrap();
        assert_eq!(error.kind, FetchErrorKind::Worker);
        assert!(result.succeeded(SourceKind::ClientRoster));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out() {
        let backend = Arc::new(MockBackend::new());
        backend.delay_source(SourceKind::SalesPerformance, Duration::from_secs(120));
        let result = Aggregator::new(backend.clone(), Duration::from_secs(30))
            .run_aggregation(Some(Arc::new(fixtures::credentials())), 4)
            .await
            .unwrap();
        let error = result.error_for(SourceKind::SalesPerformance).unwrap();
        assert_eq!(error.kind, FetchErrorKind::Timeout);
        assertions::assert_failed_exactly(&result, &[SourceKind::SalesPerformance]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_per_source() {
        let backend = Arc::new(MockBackend::new());
        backend.expect_token("someone-else");
        let result = aggregator(&backend)
            .run_aggregation(Some(Arc::new(fixtures::credentials())), 5)
            .await
            .unwrap();
        assert_eq!(result.failed_sources().len(), 6);
        assert!(result
            .failures()
            .iter()
            .all(|e| e.kind == FetchErrorKind::Unauthorized));
    }

    #[tokio::test]
    async fn test_refetch_pending_tasks_only_hits_one_source() {
        let backend = Arc::new(MockBackend::new());
        let outcome = aggregator(&backend)
            .refetch_pending_tasks(Arc::new(fixtures::credentials()), 6)
            .await;
        assert_eq!(outcome.value().map(Vec::len), Some(1));
        assert_eq!(backend.total_fetch_count(), 1);
    }
}
