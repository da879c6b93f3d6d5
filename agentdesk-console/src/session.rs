//! Dashboard session: one refresh cycle from credentials to adopted plan.
//!
//! Every refresh is tagged with a generation id. Results from an older
//! generation are dropped at each await point, so a slow cycle can never
//! overwrite the outcome of a newer one.

use crate::actions::{ActionEvent, ActionTracker, SubmitStatus};
use crate::aggregator::Aggregator;
use crate::config::ConsoleConfig;
use crate::context_builder::{build_context, check_mandatory};
use crate::kpi::{self, KpiSummary, ProductCoverage};
use crate::nav::PlanNavigator;
use crate::notifications::{
    Notification, NotificationAction, NotificationLevel, MAX_NOTIFICATIONS,
};
use agentdesk_core::{
    ActionKey, AggregationContext, AggregationResult, AuthenticationError, ClientInteraction,
    ContextIncompleteError, CredentialStore, DashboardBackend, DayPlan, Generation,
    PlanGenerationError, SourceKind, WeeklyPlan,
};
use agentdesk_llm::PlanGenerator;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub source_timeout: Duration,
    pub action_timeout: Duration,
    pub pending_refresh_delay: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self {
            source_timeout: config.source_timeout(),
            action_timeout: config.action_timeout(),
            pending_refresh_delay: config.pending_refresh_delay(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(30),
            action_timeout: Duration::from_secs(30),
            pending_refresh_delay: Duration::from_secs(1),
        }
    }
}

/// What the dashboard shows in the plan panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlanState {
    /// No refresh has completed yet.
    #[default]
    Empty,
    Ready(WeeklyPlan),
    /// The last refresh produced no plan; the message explains why.
    Unavailable(String),
}

impl PlanState {
    pub fn plan(&self) -> Option<&WeeklyPlan> {
        match self {
            PlanState::Ready(plan) => Some(plan),
            _ => None,
        }
    }
}

/// How the planning step of one refresh ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStatus {
    Ready { days: usize, interactions: usize },
    /// A mandatory source failed; the planner was not called.
    Skipped(ContextIncompleteError),
    Failed(PlanGenerationError),
    /// A newer refresh started before this one finished.
    Superseded,
}

impl PlanStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PlanStatus::Ready { .. } => "ready",
            PlanStatus::Skipped(_) => "skipped",
            PlanStatus::Failed(_) => "failed",
            PlanStatus::Superseded => "superseded",
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            PlanStatus::Skipped(reason) => Some(reason.to_string()),
            PlanStatus::Failed(error) => Some(error.to_string()),
            PlanStatus::Ready { .. } | PlanStatus::Superseded => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub generation: Generation,
    /// First failed source, rendered for display.
    pub warning: Option<String>,
    pub plan_status: PlanStatus,
}

#[derive(Debug, Default)]
struct DashboardState {
    aggregation: Option<AggregationResult>,
    context: Option<AggregationContext>,
    plan: PlanState,
    navigator: PlanNavigator,
    notifications: Vec<Notification>,
}

impl DashboardState {
    /// Append a notice, dropping the oldest beyond `MAX_NOTIFICATIONS`.
    fn notify(&mut self, notification: Notification) {
        if self.notifications.len() >= MAX_NOTIFICATIONS {
            let excess = self.notifications.len() + 1 - MAX_NOTIFICATIONS;
            self.notifications.drain(..excess);
        }
        self.notifications.push(notification);
    }
}

/// State reachable from background tasks. Holds no sender of action events,
/// so the listener task ends once the session is dropped.
struct Shared {
    credentials: Arc<dyn CredentialStore>,
    aggregator: Aggregator,
    generation: AtomicU64,
    state: Mutex<DashboardState>,
    pending_refresh_delay: Duration,
}

impl Shared {
    fn current_generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.current_generation() == generation
    }

    fn schedule_pending_refresh(self: &Arc<Self>, generation: Generation) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(shared.pending_refresh_delay).await;
            if !shared.is_current(generation) {
                tracing::debug!(generation, "Skipping pending-task refresh for stale generation");
                return;
            }
            let Some(credentials) = shared.credentials.lookup() else {
                tracing::warn!(generation, "No credentials for pending-task refresh");
                return;
            };

            let outcome = shared
                .aggregator
                .refetch_pending_tasks(credentials, generation)
                .await;

            let mut state = shared.state.lock().await;
            if !shared.is_current(generation) {
                return;
            }
            match state.aggregation.as_mut() {
                Some(aggregation) if aggregation.generation == generation => {
                    aggregation.pending_tasks = outcome;
                    tracing::debug!(generation, "Pending tasks refreshed");
                }
                _ => {}
            }
        })
    }
}

fn skipped_notice(reason: &ContextIncompleteError) -> String {
    let missing: Vec<&str> = reason
        .missing_sources()
        .iter()
        .map(SourceKind::as_str)
        .collect();
    format!("Weekly plan not generated until {} can be loaded", missing.join(" and "))
}

async fn run_action_listener(shared: Arc<Shared>, mut events: UnboundedReceiver<ActionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ActionEvent::Succeeded { key, task } => {
                shared.state.lock().await.notify(Notification::new(
                    NotificationLevel::Success,
                    format!("Task {} created for {}", task.id, key),
                ));
                shared.schedule_pending_refresh(shared.current_generation());
            }
            ActionEvent::Failed { key, error } => {
                shared.state.lock().await.notify(
                    Notification::new(
                        NotificationLevel::Error,
                        format!("Could not create task: {}", error),
                    )
                    .with_action(NotificationAction::RetryAction { key }),
                );
            }
        }
    }
}

pub struct DashboardSession {
    shared: Arc<Shared>,
    planner: PlanGenerator,
    actions: ActionTracker,
}

impl DashboardSession {
    /// Wire a session together and start its action listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        credentials: Arc<dyn CredentialStore>,
        planner: PlanGenerator,
        settings: SessionSettings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            credentials,
            aggregator: Aggregator::new(Arc::clone(&backend), settings.source_timeout),
            generation: AtomicU64::new(0),
            state: Mutex::new(DashboardState::default()),
            pending_refresh_delay: settings.pending_refresh_delay,
        });
        let actions = ActionTracker::new(backend, settings.action_timeout).with_listener(events_tx);

        tokio::spawn(run_action_listener(Arc::clone(&shared), events_rx));

        Self {
            shared,
            planner,
            actions,
        }
    }

    pub fn generation(&self) -> Generation {
        self.shared.current_generation()
    }

    pub fn actions(&self) -> &ActionTracker {
        &self.actions
    }

    pub fn planner(&self) -> &PlanGenerator {
        &self.planner
    }

    /// Run one full cycle: aggregate, build context, plan.
    ///
    /// Only a missing credential fails the call. Source and planning failures
    /// are reported in the returned `RefreshReport` and as notifications.
    pub async fn refresh(
        &self,
        current_date: NaiveDate,
    ) -> Result<RefreshReport, AuthenticationError> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let credentials = match self.shared.credentials.require() {
            Ok(credentials) => credentials,
            Err(error) => {
                tracing::warn!(generation, error = %error, "Refresh aborted");
                self.shared.state.lock().await.notify(Notification::new(
                    NotificationLevel::Error,
                    error.to_string(),
                ));
                return Err(error);
            }
        };

        let result = self
            .shared
            .aggregator
            .run_aggregation(Some(credentials), generation)
            .await?;
        let warning = result.first_failure_message();

        let context = check_mandatory(&result)
            .and_then(|()| build_context(&result).ok_or(ContextIncompleteError::BothUnavailable));

        {
            let mut state = self.shared.state.lock().await;
            if !self.shared.is_current(generation) {
                tracing::debug!(generation, "Dropping stale aggregation");
                return Ok(RefreshReport {
                    generation,
                    warning,
                    plan_status: PlanStatus::Superseded,
                });
            }
            state.aggregation = Some(result);
            state.context = context.as_ref().ok().cloned();
            if let Some(message) = &warning {
                state.notify(
                    Notification::new(NotificationLevel::Warning, message.clone())
                        .with_action(NotificationAction::Refresh),
                );
            }
        }

        let plan_status = match context {
            Err(reason) => {
                tracing::info!(generation, reason = %reason, "Planning skipped");
                let notice = Notification::new(NotificationLevel::Info, skipped_notice(&reason));
                self.clear_plan(generation, reason.to_string(), notice).await;
                PlanStatus::Skipped(reason)
            }
            Ok(context) => match self.planner.generate_plan(&context, current_date).await {
                Ok(plan) => self.adopt_plan(generation, plan).await,
                Err(error) => {
                    let notice = Notification::new(NotificationLevel::Error, error.to_string());
                    self.clear_plan(generation, error.to_string(), notice).await;
                    PlanStatus::Failed(error)
                }
            },
        };

        Ok(RefreshReport {
            generation,
            warning,
            plan_status,
        })
    }

    async fn adopt_plan(&self, generation: Generation, plan: WeeklyPlan) -> PlanStatus {
        let mut state = self.shared.state.lock().await;
        if !self.shared.is_current(generation) {
            tracing::debug!(generation, "Dropping stale plan");
            return PlanStatus::Superseded;
        }
        let status = PlanStatus::Ready {
            days: plan.day_count(),
            interactions: plan.interaction_count(),
        };
        state.plan = PlanState::Ready(plan);
        state.navigator.reset();
        status
    }

    async fn clear_plan(&self, generation: Generation, message: String, notice: Notification) {
        let mut state = self.shared.state.lock().await;
        if !self.shared.is_current(generation) {
            return;
        }
        state.plan = PlanState::Unavailable(message);
        state.navigator.reset();
        state.notify(notice.with_action(NotificationAction::Refresh));
    }

    /// Refetch pending tasks after the configured delay, if `generation`
    /// is still current by then.
    pub fn schedule_pending_refresh(&self, generation: Generation) -> JoinHandle<()> {
        self.shared.schedule_pending_refresh(generation)
    }

    /// Create a follow-up task for `interaction`, due on its day.
    pub fn submit_interaction(
        &self,
        day: &DayPlan,
        interaction: &ClientInteraction,
    ) -> Result<SubmitStatus, AuthenticationError> {
        let credentials = self.shared.credentials.require()?;
        let key = ActionKey::new(interaction.client_id, &interaction.objective);
        Ok(self.actions.submit_action(
            credentials,
            key,
            interaction.client_id,
            &interaction.objective,
            day.date,
        ))
    }

    pub async fn plan_state(&self) -> PlanState {
        self.shared.state.lock().await.plan.clone()
    }

    pub async fn aggregation(&self) -> Option<AggregationResult> {
        self.shared.state.lock().await.aggregation.clone()
    }

    /// Context the last adopted cycle was planned from.
    pub async fn context(&self) -> Option<AggregationContext> {
        self.shared.state.lock().await.context.clone()
    }

    /// Select a day of the current plan, clamped to the plan's range.
    pub async fn select_day(&self, index: usize) -> Option<DayPlan> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let plan = state.plan.plan()?;
        state.navigator.select(plan, index).cloned()
    }

    pub async fn next_day(&self) -> Option<DayPlan> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let plan = state.plan.plan()?;
        state.navigator.next(plan).cloned()
    }

    pub async fn previous_day(&self) -> Option<DayPlan> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let plan = state.plan.plan()?;
        state.navigator.previous(plan).cloned()
    }

    /// KPI cards from the last client roster, if it was fetched.
    pub async fn kpis(&self, today: NaiveDate) -> Option<KpiSummary> {
        let state = self.shared.state.lock().await;
        let roster = state.aggregation.as_ref()?.client_roster.value()?;
        Some(kpi::summarize(roster, today))
    }

    pub async fn coverage(&self) -> Option<Vec<ProductCoverage>> {
        let state = self.shared.state.lock().await;
        let roster = state.aggregation.as_ref()?.client_roster.value()?;
        Some(kpi::coverage_by_product(roster))
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.shared.state.lock().await.notifications.clone()
    }

    pub async fn drain_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.shared.state.lock().await.notifications)
    }
}

impl std::fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("generation", &self.generation())
            .field("actions", &self.actions)
            .finish()
    }
}
