//! agentdesk Test Utilities
//!
//! Centralized test infrastructure for the agentdesk workspace:
//! - Mock backend and mock planning provider
//! - Loopback HTTP stub for the real REST and provider clients
//! - Proptest generators for records, contexts and plans
//! - Test fixtures for common scenarios
//! - Custom assertions for aggregation and action state

pub use agentdesk_core::{
    ActionKey, ActionPhase, ActionState, ActionSubmissionError, ActivityItem, AgentContext,
    AgentGoalRecord, AggregationContext, AggregationResult, ClientDetail, ClientId,
    ClientInteraction, ClientRecord, CommunicationRecord, CreateTaskRequest, CreatedTask,
    Credentials, DashboardBackend, DashboardMetrics, DayPlan, DecimalValue, FetchErrorKind,
    MonthlySales, PendingTask, PendingTaskRef, PlanningProvider, PlanningRequest,
    PlanningResponse, PolicyRecord, ProviderError, SourceFetchError, SourceKind, SourceOutcome,
    TaskRecord, WeeklyPlan,
};

pub mod stub_http;
pub use stub_http::{RecordedRequest, StubReply, StubServer};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// MOCK BACKEND
// ============================================================================

/// In-memory `DashboardBackend` with failure and latency injection.
///
/// All knobs use interior mutability so a test can keep tuning the mock
/// after handing an `Arc` of it to the code under test.
pub struct MockBackend {
    metrics: Mutex<DashboardMetrics>,
    pending_tasks: Mutex<Vec<PendingTask>>,
    activity_feed: Mutex<Vec<ActivityItem>>,
    agent_goal: Mutex<AgentGoalRecord>,
    client_roster: Mutex<Vec<ClientRecord>>,
    sales_performance: Mutex<Vec<MonthlySales>>,
    failures: Mutex<HashMap<SourceKind, FetchErrorKind>>,
    panics: Mutex<HashSet<SourceKind>>,
    delays: Mutex<HashMap<SourceKind, Duration>>,
    expected_token: Mutex<Option<String>>,
    fetch_calls: Mutex<HashMap<SourceKind, usize>>,
    create_calls: AtomicUsize,
    create_requests: Mutex<Vec<CreateTaskRequest>>,
    failing_clients: Mutex<HashSet<ClientId>>,
    create_delay: Mutex<Option<Duration>>,
    create_gate: Mutex<Option<Arc<Semaphore>>>,
    next_task_id: AtomicI64,
}

impl MockBackend {
    /// A backend serving the standard fixtures for every source.
    pub fn new() -> Self {
        Self {
            metrics: Mutex::new(fixtures::metrics()),
            pending_tasks: Mutex::new(vec![fixtures::urgent_pending_task()]),
            activity_feed: Mutex::new(fixtures::activity_feed()),
            agent_goal: Mutex::new(fixtures::agent_goal()),
            client_roster: Mutex::new(vec![fixtures::client_with_overdue_renewal()]),
            sales_performance: Mutex::new(fixtures::sales_performance()),
            failures: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            expected_token: Mutex::new(None),
            fetch_calls: Mutex::new(HashMap::new()),
            create_calls: AtomicUsize::new(0),
            create_requests: Mutex::new(Vec::new()),
            failing_clients: Mutex::new(HashSet::new()),
            create_delay: Mutex::new(None),
            create_gate: Mutex::new(None),
            next_task_id: AtomicI64::new(1000),
        }
    }

    // === Data ===

    pub fn set_pending_tasks(&self, tasks: Vec<PendingTask>) {
        *self.pending_tasks.lock().unwrap() = tasks;
    }

    pub fn set_agent_goal(&self, goal: AgentGoalRecord) {
        *self.agent_goal.lock().unwrap() = goal;
    }

    pub fn set_client_roster(&self, roster: Vec<ClientRecord>) {
        *self.client_roster.lock().unwrap() = roster;
    }

    // === Read-side injection ===

    /// Make every read of `source` fail with `kind`.
    pub fn fail_source(&self, source: SourceKind, kind: FetchErrorKind) {
        self.failures.lock().unwrap().insert(source, kind);
    }

    pub fn heal_source(&self, source: SourceKind) {
        self.failures.lock().unwrap().remove(&source);
        self.panics.lock().unwrap().remove(&source);
    }

    /// Make every read of `source` panic inside its worker task.
    pub fn panic_source(&self, source: SourceKind) {
        self.panics.lock().unwrap().insert(source);
    }

    pub fn delay_source(&self, source: SourceKind, delay: Duration) {
        self.delays.lock().unwrap().insert(source, delay);
    }

    /// Reject any credential whose token differs from `token`.
    pub fn expect_token(&self, token: impl Into<String>) {
        *self.expected_token.lock().unwrap() = Some(token.into());
    }

    pub fn fetch_count(&self, source: SourceKind) -> usize {
        self.fetch_calls
            .lock()
            .unwrap()
            .get(&source)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetch_count(&self) -> usize {
        self.fetch_calls.lock().unwrap().values().sum()
    }

    // === Write-side injection ===

    /// Make `create_task` fail with a transport error for `client_id`.
    pub fn fail_create_for(&self, client_id: ClientId) {
        self.failing_clients.lock().unwrap().insert(client_id);
    }

    pub fn delay_create(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    /// Hold every `create_task` call until `open_create_gate` releases it.
    pub fn gate_creates(&self) {
        *self.create_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `permits` gated `create_task` calls proceed.
    pub fn open_create_gate(&self, permits: usize) {
        if let Some(gate) = self.create_gate.lock().unwrap().as_ref() {
            gate.add_permits(permits);
        }
    }

    /// Number of task-creation requests that reached the backend.
    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn create_requests(&self) -> Vec<CreateTaskRequest> {
        self.create_requests.lock().unwrap().clone()
    }

    async fn enter(
        &self,
        source: SourceKind,
        credentials: &Credentials,
    ) -> Result<(), SourceFetchError> {
        *self.fetch_calls.lock().unwrap().entry(source).or_insert(0) += 1;

        let delay = self.delays.lock().unwrap().get(&source).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics.lock().unwrap().contains(&source) {
            panic!("injected panic in {} worker", source);
        }

        let expected = self.expected_token.lock().unwrap().clone();
        if let Some(expected) = expected {
            if credentials.token() != expected {
                return Err(SourceFetchError::new(
                    source,
                    FetchErrorKind::Unauthorized,
                    "invalid bearer token",
                ));
            }
        }

        let injected = self.failures.lock().unwrap().get(&source).copied();
        match injected {
            Some(kind) => Err(SourceFetchError::new(source, kind, "injected failure")),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("fetches", &self.total_fetch_count())
            .field("creates", &self.create_count())
            .finish()
    }
}

#[async_trait]
impl DashboardBackend for MockBackend {
    async fn fetch_metrics(
        &self,
        credentials: &Credentials,
    ) -> Result<DashboardMetrics, SourceFetchError> {
        self.enter(SourceKind::Metrics, credentials).await?;
        Ok(self.metrics.lock().unwrap().clone())
    }

    async fn fetch_pending_tasks(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PendingTask>, SourceFetchError> {
        self.enter(SourceKind::PendingTasks, credentials).await?;
        Ok(self.pending_tasks.lock().unwrap().clone())
    }

    async fn fetch_activity_feed(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ActivityItem>, SourceFetchError> {
        self.enter(SourceKind::ActivityFeed, credentials).await?;
        Ok(self.activity_feed.lock().unwrap().clone())
    }

    async fn fetch_agent_goal(
        &self,
        credentials: &Credentials,
    ) -> Result<AgentGoalRecord, SourceFetchError> {
        self.enter(SourceKind::AgentGoal, credentials).await?;
        Ok(self.agent_goal.lock().unwrap().clone())
    }

    async fn fetch_client_roster(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ClientRecord>, SourceFetchError> {
        self.enter(SourceKind::ClientRoster, credentials).await?;
        Ok(self.client_roster.lock().unwrap().clone())
    }

    async fn fetch_sales_performance(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<MonthlySales>, SourceFetchError> {
        self.enter(SourceKind::SalesPerformance, credentials).await?;
        Ok(self.sales_performance.lock().unwrap().clone())
    }

    async fn create_task(
        &self,
        _credentials: &Credentials,
        request: &CreateTaskRequest,
    ) -> Result<CreatedTask, ActionSubmissionError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_requests.lock().unwrap().push(request.clone());

        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_clients.lock().unwrap().contains(&request.client_id) {
            return Err(ActionSubmissionError::Transport {
                message: "connection reset by peer".to_string(),
            });
        }

        Ok(CreatedTask {
            id: self.next_task_id.fetch_add(1, Ordering::SeqCst),
            client_id: Some(request.client_id),
            description: request.description.clone(),
            due_date: request
                .due_date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive)),
            is_urgent: request.is_urgent,
            is_completed: false,
        })
    }
}

// ============================================================================
// MOCK PLANNING PROVIDER
// ============================================================================

/// Planning provider that returns canned text and records every prompt.
pub struct MockPlanningProvider {
    response: Result<String, ProviderError>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockPlanningProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// The serialized context embedded at the end of the most recent prompt.
    pub fn last_context_json(&self) -> Option<serde_json::Value> {
        let prompts = self.prompts.lock().unwrap();
        let prompt = prompts.last()?;
        let (_, context) = prompt.rsplit_once("Context:\n")?;
        serde_json::from_str(context).ok()
    }
}

impl std::fmt::Debug for MockPlanningProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPlanningProvider")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl PlanningProvider for MockPlanningProvider {
    fn provider_id(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        "mock-planner"
    }

    async fn complete(&self, request: PlanningRequest) -> Result<PlanningResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = self.response.clone()?;
        Ok(PlanningResponse {
            request_id: request.request_id,
            input_tokens: Some((request.prompt.len() / 4) as i64),
            output_tokens: Some((text.len() / 4) as i64),
            text,
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for agentdesk records, contexts and plans.

    use super::*;
    use agentdesk_core::{CommunicationSummary, PolicySummary, TaskSummary};
    use proptest::prelude::*;

    /// A bitmask over `SourceKind::ALL`; bit `i` set means source `i` fails.
    pub fn arb_failure_mask() -> impl Strategy<Value = u8> {
        0u8..64
    }

    /// Sources selected by `mask`, in `SourceKind::ALL` order.
    pub fn sources_in_mask(mask: u8) -> Vec<SourceKind> {
        SourceKind::ALL
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, kind)| *kind)
            .collect()
    }

    pub fn arb_fetch_error_kind() -> impl Strategy<Value = FetchErrorKind> {
        prop_oneof![
            Just(FetchErrorKind::Transport),
            (400u16..600).prop_map(FetchErrorKind::Status),
            Just(FetchErrorKind::Unauthorized),
            Just(FetchErrorKind::Decode),
            Just(FetchErrorKind::Timeout),
        ]
    }

    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..3650).prop_map(|offset| fixtures::date(2020, 1, 1) + chrono::Duration::days(offset))
    }

    pub fn arb_decimal() -> impl Strategy<Value = Option<DecimalValue>> {
        prop_oneof![
            Just(None),
            (0u32..10_000_000).prop_map(|n| Some(DecimalValue::Number(f64::from(n)))),
            (0u32..10_000_000).prop_map(|n| Some(DecimalValue::Text(format!("{}.00", n)))),
        ]
    }

    pub fn arb_policy_record() -> impl Strategy<Value = PolicyRecord> {
        (
            1i64..100_000,
            prop::option::of("[A-Z][a-z]{3,10}( Plus)?"),
            prop_oneof![Just("Active"), Just("Lapsed"), Just("Pending")],
            arb_decimal(),
            arb_decimal(),
            prop::option::of(arb_date()),
        )
            .prop_map(|(id, product, status, premium, sum_insured, end)| PolicyRecord {
                id,
                policy_number: Some(format!("POL-{:06}", id)),
                product_name: product,
                status: status.to_string(),
                premium,
                sum_insured,
                start_date: None,
                end_date: end
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|n| Utc.from_utc_datetime(&n)),
            })
    }

    pub fn arb_client_record() -> impl Strategy<Value = ClientRecord> {
        (
            1i64..100_000,
            "[A-Z][a-z]{2,8} [A-Z][a-z]{2,10}",
            arb_decimal(),
            prop::option::of(0u32..6),
            prop::collection::vec(arb_policy_record(), 0..4),
            prop::collection::vec(0i64..1_000_000, 0..4),
        )
            .prop_map(|(id, name, income, dependents, policies, comm_offsets)| ClientRecord {
                id,
                name,
                email: None,
                phone: None,
                date_of_birth: None,
                annual_income: income,
                dependents,
                job_profile: None,
                marital_status: None,
                policies,
                communications: comm_offsets
                    .into_iter()
                    .map(|secs| CommunicationRecord {
                        communication_type: "Call".to_string(),
                        timestamp: fixtures::timestamp(2025, 1, 1)
                            + chrono::Duration::seconds(secs),
                        summary: None,
                    })
                    .collect(),
                tasks: vec![],
            })
    }

    pub fn arb_pending_task() -> impl Strategy<Value = PendingTask> {
        (1i64..100_000, "[A-Za-z ]{1,30}", any::<bool>()).prop_map(|(id, description, is_urgent)| {
            PendingTask {
                id,
                description,
                is_urgent,
                due_date: None,
                client_id: None,
                client_name: None,
            }
        })
    }

    pub fn arb_client_detail() -> impl Strategy<Value = ClientDetail> {
        (
            1i64..100_000,
            "[A-Z][a-z]{2,8}",
            prop::option::of(0u32..5_000_000),
            prop::collection::vec((1i64..1000, "[A-Z][a-z]{3,10}"), 0..3),
            prop::collection::vec(any::<bool>(), 0..3),
        )
            .prop_map(|(client_id, name, income, policies, tasks)| ClientDetail {
                client_id,
                name,
                date_of_birth: None,
                annual_income: income.map(f64::from),
                dependents: None,
                job_profile: None,
                marital_status: None,
                policies: policies
                    .into_iter()
                    .map(|(policy_id, product)| PolicySummary {
                        policy_id,
                        product_name: Some(product),
                        status: "Active".to_string(),
                        premium: None,
                        sum_insured: None,
                        start_date: None,
                        end_date: None,
                    })
                    .collect(),
                communications: vec![CommunicationSummary {
                    communication_type: "Email".to_string(),
                    timestamp: fixtures::timestamp(2025, 3, 1),
                    summary: None,
                }],
                tasks: tasks
                    .into_iter()
                    .map(|is_urgent| TaskSummary {
                        description: "Follow up".to_string(),
                        is_completed: false,
                        is_urgent,
                        due_date: None,
                    })
                    .collect(),
            })
    }

    pub fn arb_context() -> impl Strategy<Value = AggregationContext> {
        (
            prop::option::of(0u32..10_000_000),
            prop::option::of("20[2-3][0-9]-Q[1-4]"),
            prop::collection::vec(arb_client_detail(), 0..5),
            prop::collection::vec((1i64..1000, any::<bool>()), 0..5),
        )
            .prop_map(|(goal, period, clients, tasks)| AggregationContext {
                agent_context: AgentContext {
                    annual_income_goal: goal.map(f64::from),
                    target_period: period,
                },
                client_details: clients,
                pending_tasks: tasks
                    .into_iter()
                    .map(|(id, is_urgent)| PendingTaskRef {
                        id,
                        description: format!("Task {}", id),
                        is_urgent,
                        due_date: None,
                        client_name: None,
                    })
                    .collect(),
            })
    }

    /// A well-formed plan with `0..=7` consecutive days starting 2025-04-07.
    pub fn arb_weekly_plan() -> impl Strategy<Value = WeeklyPlan> {
        (0usize..=7).prop_map(fixtures::weekly_plan)
    }

    pub fn arb_action_key() -> impl Strategy<Value = ActionKey> {
        (1i64..100, "[A-Za-z ]{1,20}")
            .prop_map(|(client_id, objective)| ActionKey::new(client_id, &objective))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use agentdesk_core::{CommunicationSummary, PolicySummary};
    use chrono::Duration;

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub fn timestamp(year: i32, month: u32, day: u32) -> agentdesk_core::Timestamp {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
    }

    /// Wednesday 2025-04-02, the date most tests pin as "today".
    pub fn reference_date() -> NaiveDate {
        date(2025, 4, 2)
    }

    pub fn credentials() -> Credentials {
        Credentials::bearer("test-token").unwrap()
    }

    pub fn metrics() -> DashboardMetrics {
        DashboardMetrics {
            total_clients: 1,
            active_policies: 1,
            total_premium: Some(DecimalValue::Text("12000.00".to_string())),
            upcoming_renewals: 1,
        }
    }

    /// `{annualIncomeGoal: 500000, targetPeriod: "2025-Q2"}`, with the goal
    /// sent as the backend's decimal string.
    pub fn agent_goal() -> AgentGoalRecord {
        AgentGoalRecord {
            annual_income_goal: Some(DecimalValue::Text("500000.00".to_string())),
            target_period: Some("2025-Q2".to_string()),
        }
    }

    pub fn urgent_pending_task() -> PendingTask {
        PendingTask {
            id: 1,
            description: "Call X".to_string(),
            is_urgent: true,
            due_date: None,
            client_id: Some(1),
            client_name: Some("Asha Rao".to_string()),
        }
    }

    /// Client 1 with an active motor policy whose renewal date has passed.
    pub fn client_with_overdue_renewal() -> ClientRecord {
        ClientRecord {
            id: 1,
            name: "Asha Rao".to_string(),
            email: Some("asha@example.com".to_string()),
            phone: None,
            date_of_birth: Some(timestamp(1985, 6, 14)),
            annual_income: Some(DecimalValue::Number(1_200_000.0)),
            dependents: Some(2),
            job_profile: Some("Engineer".to_string()),
            marital_status: Some("Married".to_string()),
            policies: vec![PolicyRecord {
                id: 11,
                policy_number: Some("MOT-0011".to_string()),
                product_name: Some("Motor Comprehensive".to_string()),
                status: "Active".to_string(),
                premium: Some(DecimalValue::Text("12000.00".to_string())),
                sum_insured: Some(DecimalValue::Number(800_000.0)),
                start_date: Some(timestamp(2024, 3, 25)),
                end_date: Some(timestamp(2025, 3, 25)),
            }],
            communications: vec![
                CommunicationRecord {
                    communication_type: "Email".to_string(),
                    timestamp: timestamp(2025, 1, 10),
                    summary: Some("Sent renewal quote".to_string()),
                },
                CommunicationRecord {
                    communication_type: "Call".to_string(),
                    timestamp: timestamp(2025, 3, 2),
                    summary: Some("Asked for a discount".to_string()),
                },
            ],
            tasks: vec![TaskRecord {
                description: "Collect renewal documents".to_string(),
                is_completed: false,
                is_urgent: true,
                due_date: Some(timestamp(2025, 3, 30)),
            }],
        }
    }

    pub fn activity_feed() -> Vec<ActivityItem> {
        vec![ActivityItem {
            id: 7,
            activity_type: "Call".to_string(),
            description: "Discussed renewal".to_string(),
            timestamp: timestamp(2025, 3, 2),
            client_name: Some("Asha Rao".to_string()),
        }]
    }

    pub fn sales_performance() -> Vec<MonthlySales> {
        vec![
            MonthlySales {
                month: "2025-02".to_string(),
                count: 3,
            },
            MonthlySales {
                month: "2025-03".to_string(),
                count: 5,
            },
        ]
    }

    pub fn client_detail(client_id: ClientId, name: &str) -> ClientDetail {
        ClientDetail {
            client_id,
            name: name.to_string(),
            date_of_birth: Some(date(1985, 6, 14)),
            annual_income: Some(1_200_000.0),
            dependents: Some(2),
            job_profile: Some("Engineer".to_string()),
            marital_status: Some("Married".to_string()),
            policies: vec![PolicySummary {
                policy_id: 11,
                product_name: Some("Motor Comprehensive".to_string()),
                status: "Active".to_string(),
                premium: Some(12000.0),
                sum_insured: Some(800_000.0),
                start_date: Some(date(2024, 3, 25)),
                end_date: Some(date(2025, 3, 25)),
            }],
            communications: vec![CommunicationSummary {
                communication_type: "Call".to_string(),
                timestamp: timestamp(2025, 3, 2),
                summary: None,
            }],
            tasks: vec![],
        }
    }

    pub fn context_with_one_client() -> AggregationContext {
        AggregationContext {
            agent_context: AgentContext {
                annual_income_goal: Some(500000.0),
                target_period: Some("2025-Q2".to_string()),
            },
            client_details: vec![client_detail(1, "Asha Rao")],
            pending_tasks: vec![PendingTaskRef {
                id: 1,
                description: "Call X".to_string(),
                is_urgent: true,
                due_date: None,
                client_name: Some("Asha Rao".to_string()),
            }],
        }
    }

    pub fn empty_roster_context() -> AggregationContext {
        AggregationContext {
            agent_context: AgentContext {
                annual_income_goal: Some(500000.0),
                target_period: Some("2025-Q2".to_string()),
            },
            client_details: vec![],
            pending_tasks: vec![],
        }
    }

    /// A plan of `days` consecutive days starting Monday 2025-04-07, each
    /// with one interaction for client 1.
    pub fn weekly_plan(days: usize) -> WeeklyPlan {
        let monday = date(2025, 4, 7);
        WeeklyPlan {
            weekly_goal: "Close overdue renewals".to_string(),
            daily_plan: (0..days.min(7))
                .map(|offset| {
                    let day_date = monday + Duration::days(offset as i64);
                    DayPlan {
                        day: day_date.format("%A").to_string(),
                        date: day_date,
                        theme: format!("Theme {}", offset + 1),
                        client_interactions: vec![ClientInteraction {
                            client_name: "Asha Rao".to_string(),
                            client_id: 1,
                            objective: format!("Objective {}", offset + 1),
                            interaction_mode: "Call".to_string(),
                            talking_points: "Renewal options".to_string(),
                            products_to_focus_on: vec!["Motor Comprehensive".to_string()],
                            rationale: "Renewal overdue".to_string(),
                        }],
                        general_tasks: vec![],
                    }
                })
                .collect(),
        }
    }

    /// Planner response text: a one-day plan with a single interaction for
    /// `client_id`.
    pub fn plan_json_for_client(client_id: ClientId) -> String {
        serde_json::json!({
            "weeklyGoal": "Close overdue renewals",
            "dailyPlan": [{
                "day": "Monday",
                "date": "2025-04-07",
                "theme": "Renewals",
                "clientInteractions": [{
                    "clientName": "Asha Rao",
                    "clientId": client_id,
                    "objective": "Renew motor policy",
                    "interactionMode": "Call",
                    "talkingPoints": "Policy renewal is overdue; offer reinstatement.",
                    "productsToFocusOn": ["Motor Comprehensive"],
                    "rationale": "Renewal date has passed"
                }],
                "generalTasks": ["Update notes"]
            }]
        })
        .to_string()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over aggregation results and action state.

    use super::*;

    /// Assert that exactly the sources in `failed` are `Failed`.
    #[track_caller]
    pub fn assert_failed_exactly(result: &AggregationResult, failed: &[SourceKind]) {
        for kind in SourceKind::ALL {
            let expect_failed = failed.contains(&kind);
            assert_eq!(
                !result.succeeded(kind),
                expect_failed,
                "source {} expected failed={}, outcome error={:?}",
                kind,
                expect_failed,
                result.error_for(kind)
            );
        }
    }

    #[track_caller]
    pub fn assert_phase(state: Option<ActionState>, phase: ActionPhase) {
        match state {
            Some(state) => assert_eq!(state.phase, phase, "unexpected action state {:?}", state),
            None => panic!("expected {:?}, no state recorded", phase),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_mock_backend_serves_fixtures() {
        let backend = MockBackend::new();
        let creds = fixtures::credentials();
        let roster = backend.fetch_client_roster(&creds).await.unwrap();
        assert_eq!(roster[0].id, 1);
        assert_eq!(backend.fetch_count(SourceKind::ClientRoster), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_injected_failure() {
        let backend = MockBackend::new();
        backend.fail_source(SourceKind::AgentGoal, FetchErrorKind::Status(500));
        let err = backend
            .fetch_agent_goal(&fixtures::credentials())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Status(500));

        backend.heal_source(SourceKind::AgentGoal);
        assert!(backend.fetch_agent_goal(&fixtures::credentials()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_backend_rejects_unexpected_token() {
        let backend = MockBackend::new();
        backend.expect_token("other-token");
        let err = backend
            .fetch_metrics(&fixtures::credentials())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_mock_backend_create_failure_per_client() {
        let backend = MockBackend::new();
        backend.fail_create_for(2);
        let ok = CreateTaskRequest {
            client_id: 1,
            description: "Renew".to_string(),
            due_date: fixtures::date(2025, 4, 7),
            is_urgent: false,
        };
        let bad = CreateTaskRequest { client_id: 2, ..ok.clone() };
        assert!(backend.create_task(&fixtures::credentials(), &ok).await.is_ok());
        assert!(backend.create_task(&fixtures::credentials(), &bad).await.is_err());
        assert_eq!(backend.create_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_planner_records_prompt() {
        let provider = MockPlanningProvider::new("{}");
        let response = provider
            .complete(PlanningRequest {
                request_id: uuid_for_test(),
                system: None,
                prompt: "Context:\n{\"a\":1}".to_string(),
                max_tokens: 10,
                temperature: None,
            })
            .await
            .unwrap();
        assert_eq!(response.text, "{}");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_context_json().unwrap()["a"], 1);
    }

    fn uuid_for_test() -> uuid::Uuid {
        uuid::Uuid::nil()
    }

    #[test]
    fn test_weekly_plan_fixture_days_ascend() {
        let plan = fixtures::weekly_plan(5);
        assert_eq!(plan.day_count(), 5);
        assert_eq!(plan.daily_plan[0].day, "Monday");
        assert!(plan.daily_plan.windows(2).all(|w| w[0].date < w[1].date));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_mask_selects_matching_sources(mask in generators::arb_failure_mask()) {
            let sources = generators::sources_in_mask(mask);
            prop_assert_eq!(sources.len(), mask.count_ones() as usize);
        }

        #[test]
        fn prop_generated_context_serializes(context in generators::arb_context()) {
            prop_assert!(context.to_json().is_ok());
        }
    }
}
