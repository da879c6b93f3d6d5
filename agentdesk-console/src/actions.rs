//! Per-suggestion task submission tracking.
//!
//! Each `ActionKey` owns one entry in a sharded concurrent map. A submission
//! only ever locks the shard holding its own key, and only for the
//! read-modify-write of that entry; the network call runs on its own task.

use agentdesk_core::{
    ActionKey, ActionPhase, ActionState, ActionSubmissionError, ClientId, CreateTaskRequest,
    CreatedTask, Credentials, DashboardBackend,
};
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Terminal transition of one submission, published to the listener.
#[derive(Debug, Clone)]
pub enum ActionEvent {
    Succeeded { key: ActionKey, task: CreatedTask },
    Failed { key: ActionKey, error: ActionSubmissionError },
}

impl ActionEvent {
    pub fn key(&self) -> &ActionKey {
        match self {
            ActionEvent::Succeeded { key, .. } | ActionEvent::Failed { key, .. } => key,
        }
    }
}

/// Result of `submit_action`.
#[derive(Debug)]
pub enum SubmitStatus {
    /// A task-creation request was started; the handle resolves once the
    /// entry has been updated.
    Dispatched(JoinHandle<()>),
    /// The key already had a request in flight; nothing was sent.
    AlreadyPending,
}

impl SubmitStatus {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, SubmitStatus::Dispatched(_))
    }

    /// Wait for a dispatched submission to settle. No-op otherwise.
    pub async fn settled(self) {
        if let SubmitStatus::Dispatched(handle) = self {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Action worker did not complete");
            }
        }
    }
}

#[derive(Clone)]
pub struct ActionTracker {
    backend: Arc<dyn DashboardBackend>,
    states: Arc<DashMap<ActionKey, ActionState>>,
    next_attempt: Arc<AtomicU64>,
    timeout: Duration,
    listener: Option<UnboundedSender<ActionEvent>>,
}

impl ActionTracker {
    pub fn new(backend: Arc<dyn DashboardBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            states: Arc::new(DashMap::new()),
            next_attempt: Arc::new(AtomicU64::new(0)),
            timeout,
            listener: None,
        }
    }

    /// Publish every applied terminal transition to `listener`.
    pub fn with_listener(mut self, listener: UnboundedSender<ActionEvent>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Create a follow-up task for one suggested interaction.
    ///
    /// A key that is already `Pending` is left alone and no request is sent.
    /// Any other state (absent, `Succeeded`, `Failed`) moves to `Pending` and a
    /// new request is dispatched.
    pub fn submit_action(
        &self,
        credentials: Arc<Credentials>,
        key: ActionKey,
        client_id: ClientId,
        objective: &str,
        due_date: NaiveDate,
    ) -> SubmitStatus {
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed) + 1;

        match self.states.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_pending() {
                    tracing::debug!(action_key = %key, "Submission already pending");
                    return SubmitStatus::AlreadyPending;
                }
                entry.insert(ActionState::pending(attempt));
            }
            Entry::Vacant(entry) => {
                entry.insert(ActionState::pending(attempt));
            }
        }

        let request = CreateTaskRequest {
            client_id,
            description: objective.to_string(),
            due_date,
            is_urgent: false,
        };

        tracing::info!(action_key = %key, attempt, client_id, "Submitting task");

        let backend = Arc::clone(&self.backend);
        let states = Arc::clone(&self.states);
        let listener = self.listener.clone();
        let timeout = self.timeout;

        SubmitStatus::Dispatched(tokio::spawn(async move {
            let outcome = run_submission(backend, credentials, request, timeout).await;
            let next = match &outcome {
                Ok(_) => ActionState::succeeded(attempt),
                Err(error) => ActionState::failed(attempt, error.to_string()),
            };

            if !apply_completion(&states, &key, attempt, next) {
                tracing::debug!(action_key = %key, attempt, "Dropping stale completion");
                return;
            }

            let event = match outcome {
                Ok(task) => {
                    tracing::info!(action_key = %key, attempt, task_id = task.id, "Task created");
                    ActionEvent::Succeeded { key, task }
                }
                Err(error) => {
                    tracing::warn!(
                        action_key = %key,
                        attempt,
                        error = %error,
                        "Task submission failed"
                    );
                    ActionEvent::Failed { key, error }
                }
            };
            if let Some(listener) = listener {
                let _ = listener.send(event);
            }
        }))
    }

    pub fn state(&self, key: &ActionKey) -> Option<ActionState> {
        self.states.get(key).map(|entry| entry.value().clone())
    }

    /// Phase of `key`; keys never submitted are `Idle`.
    pub fn phase(&self, key: &ActionKey) -> ActionPhase {
        self.state(key)
            .map(|state| state.phase)
            .unwrap_or(ActionPhase::Idle)
    }

    /// Every tracked key, sorted by key.
    pub fn snapshot(&self) -> Vec<(ActionKey, ActionState)> {
        let mut entries: Vec<(ActionKey, ActionState)> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Forget `key`. An in-flight completion for it will be dropped.
    pub fn clear(&self, key: &ActionKey) {
        self.states.remove(key);
    }

    pub fn clear_all(&self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl std::fmt::Debug for ActionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTracker")
            .field("tracked", &self.states.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

async fn run_submission(
    backend: Arc<dyn DashboardBackend>,
    credentials: Arc<Credentials>,
    request: CreateTaskRequest,
    timeout: Duration,
) -> Result<CreatedTask, ActionSubmissionError> {
    let call = tokio::spawn(async move { backend.create_task(&credentials, &request).await });
    let abort = call.abort_handle();

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ActionSubmissionError::Worker {
            message: join_error.to_string(),
        }),
        Err(_) => {
            abort.abort();
            Err(ActionSubmissionError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Write `next` only if `key` is still pending on `attempt`.
fn apply_completion(
    states: &DashMap<ActionKey, ActionState>,
    key: &ActionKey,
    attempt: u64,
    next: ActionState,
) -> bool {
    match states.get_mut(key) {
        Some(mut entry) if entry.attempt == attempt && entry.is_pending() => {
            *entry = next;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_test_utils::{assertions, fixtures, MockBackend};
    use tokio::sync::mpsc;

    fn tracker(backend: &Arc<MockBackend>) -> ActionTracker {
        ActionTracker::new(backend.clone(), Duration::from_secs(30))
    }

    fn creds() -> Arc<Credentials> {
        Arc::new(fixtures::credentials())
    }

    fn monday() -> NaiveDate {
        fixtures::date(2025, 4, 7)
    }

    #[tokio::test]
    async fn test_success_path() {
        let backend = Arc::new(MockBackend::new());
        let tracker = tracker(&backend);
        let key = ActionKey::new(1, "Renew motor policy");

        let status = tracker.submit_action(creds(), key.clone(), 1, "Renew motor policy", monday());
        assert!(status.is_dispatched());
        status.settled().await;

        assertions::assert_phase(tracker.state(&key), ActionPhase::Succeeded);
        let sent = backend.create_requests();
        assert_eq!(sent[0].description, "Renew motor policy");
        assert!(!sent[0].is_urgent);
        assert_eq!(sent[0].due_date, monday());
    }

    #[tokio::test]
    async fn test_double_submit_while_pending_sends_once() {
        let backend = Arc::new(MockBackend::new());
        backend.gate_creates();
        let tracker = tracker(&backend);
        let key = ActionKey::new(1, "Call");

        let first = tracker.submit_action(creds(), key.clone(), 1, "Call", monday());
        let second = tracker.submit_action(creds(), key.clone(), 1, "Call", monday());
        assert!(matches!(second, SubmitStatus::AlreadyPending));
        assert_eq!(tracker.phase(&key), ActionPhase::Pending);

        backend.open_create_gate(1);
        first.settled().await;
        assert_eq!(backend.create_count(), 1);
        assert_eq!(tracker.phase(&key), ActionPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_key() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_create_for(2);
        let tracker = tracker(&backend);
        let key_a = ActionKey::new(2, "Review cover");
        let key_b = ActionKey::new(1, "Renew");

        let a = tracker.submit_action(creds(), key_a.clone(), 2, "Review cover", monday());
        let b = tracker.submit_action(creds(), key_b.clone(), 1, "Renew", monday());
        a.settled().await;
        b.settled().await;

        let state_a = tracker.state(&key_a).unwrap();
        assert_eq!(state_a.phase, ActionPhase::Failed);
        assert!(state_a.error.unwrap().contains("connection reset"));
        assert_eq!(tracker.phase(&key_b), ActionPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_resubmit_after_failure_and_success() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_create_for(3);
        let tracker = tracker(&backend);
        let failed_key = ActionKey::new(3, "Retry me");

        tracker
            .submit_action(creds(), failed_key.clone(), 3, "Retry me", monday())
            .settled()
            .await;
        assert_eq!(tracker.phase(&failed_key), ActionPhase::Failed);

        let retry = tracker.submit_action(creds(), failed_key.clone(), 3, "Retry me", monday());
        assert!(retry.is_dispatched());
        retry.settled().await;
        assert_eq!(backend.create_count(), 2);

        let ok_key = ActionKey::new(1, "Again");
        tracker.submit_action(creds(), ok_key.clone(), 1, "Again", monday()).settled().await;
        let again = tracker.submit_action(creds(), ok_key.clone(), 1, "Again", monday());
        assert!(again.is_dispatched());
        again.settled().await;
        assert_eq!(tracker.phase(&ok_key), ActionPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_cleared_entry_drops_late_completion() {
        let backend = Arc::new(MockBackend::new());
        backend.gate_creates();
        let tracker = tracker(&backend);
        let key = ActionKey::new(1, "Late");

        let status = tracker.submit_action(creds(), key.clone(), 1, "Late", monday());
        tracker.clear(&key);
        backend.open_create_gate(1);
        status.settled().await;

        assert!(tracker.state(&key).is_none());
        assert_eq!(tracker.phase(&key), ActionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let backend = Arc::new(MockBackend::new());
        backend.delay_create(Duration::from_secs(120));
        let tracker = ActionTracker::new(backend.clone(), Duration::from_secs(5));
        let key = ActionKey::new(1, "Slow");

        tracker.submit_action(creds(), key.clone(), 1, "Slow", monday()).settled().await;
        let state = tracker.state(&key).unwrap();
        assert_eq!(state.phase, ActionPhase::Failed);
        assert!(state.error.unwrap().contains("5000"));
    }

    #[tokio::test]
    async fn test_listener_receives_terminal_events() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_create_for(9);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tracker = tracker(&backend).with_listener(tx);

        tracker
            .submit_action(creds(), ActionKey::new(1, "Ok"), 1, "Ok", monday())
            .settled()
            .await;
        tracker
            .submit_action(creds(), ActionKey::new(9, "Bad"), 9, "Bad", monday())
            .settled()
            .await;

        assert!(matches!(rx.recv().await, Some(ActionEvent::Succeeded { .. })));
        match rx.recv().await {
            Some(ActionEvent::Failed { key, .. }) => assert_eq!(key.as_str(), "9|Bad"),
            other => panic!("expected failure event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_snapshot_and_clear_all() {
        let backend = Arc::new(MockBackend::new());
        let tracker = tracker(&backend);
        for id in [2, 1] {
            tracker
                .submit_action(creds(), ActionKey::new(id, "x"), id, "x", monday())
                .settled()
                .await;
        }
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0.as_str(), "1|x");

        tracker.clear_all();
        assert!(tracker.is_empty());
    }
}
