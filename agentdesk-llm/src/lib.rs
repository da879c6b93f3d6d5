//! agentdesk LLM - weekly plan generation
//!
//! Turns an `AggregationContext` into a validated `WeeklyPlan` by way of a
//! pluggable `PlanningProvider`. The crate owns the instruction template,
//! strict response parsing and the concrete hosted providers.

use agentdesk_core::{
    AggregationContext, PlanGenerationError, PlanningProvider, PlanningRequest, WeeklyPlan,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod prompt;
pub mod providers;
pub mod schema;

pub use prompt::{build_instruction, next_monday, SYSTEM_PROMPT};
pub use providers::{
    build_provider, AnthropicClient, AnthropicPlanningProvider, OpenAIClient,
    OpenAIPlanningProvider, ProviderKind, ProviderSettings,
};
pub use schema::{parse_plan, validate_client_refs, validate_plan};

// ============================================================================
// PLANNER SETTINGS
// ============================================================================

/// Per-call knobs for the planning service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerSettings {
    pub max_tokens: i32,
    pub temperature: Option<f32>,
    /// Upper bound on one planning call, including provider-side queueing.
    pub timeout: Duration,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: Some(0.2),
            timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// USAGE TRACKER
// ============================================================================

/// Token usage across planning calls.
/// Thread-safe via atomic operations.
pub struct UsageTracker {
    calls: AtomicU64,
    prompt_tokens: AtomicI64,
    completion_tokens: AtomicI64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            prompt_tokens: AtomicI64::new(0),
            completion_tokens: AtomicI64::new(0),
        }
    }

    /// Record one completed planning call. Providers that do not report
    /// usage contribute zero tokens but still count as a call.
    pub fn record(&self, prompt_tokens: Option<i64>, completion_tokens: Option<i64>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prompt_tokens
            .fetch_add(prompt_tokens.unwrap_or(0), Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(completion_tokens.unwrap_or(0), Ordering::Relaxed);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn prompt_tokens(&self) -> i64 {
        self.prompt_tokens.load(Ordering::Relaxed)
    }

    pub fn completion_tokens(&self) -> i64 {
        self.completion_tokens.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.prompt_tokens.store(0, Ordering::Relaxed);
        self.completion_tokens.store(0, Ordering::Relaxed);
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("calls", &self.calls())
            .field("prompt_tokens", &self.prompt_tokens())
            .field("completion_tokens", &self.completion_tokens())
            .finish()
    }
}

// ============================================================================
// PLAN GENERATOR
// ============================================================================

/// Plan Generation Client.
///
/// Stateless apart from usage counters: every call builds the instruction
/// from scratch, so identical `(context, current_date)` pairs send identical
/// prompts.
pub struct PlanGenerator {
    provider: Arc<dyn PlanningProvider>,
    settings: PlannerSettings,
    usage: Arc<UsageTracker>,
}

impl PlanGenerator {
    pub fn new(provider: Arc<dyn PlanningProvider>, settings: PlannerSettings) -> Self {
        Self {
            provider,
            settings,
            usage: Arc::new(UsageTracker::new()),
        }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn usage(&self) -> Arc<UsageTracker> {
        Arc::clone(&self.usage)
    }

    /// Build the request that `generate_plan` would send.
    pub fn build_request(
        &self,
        context: &AggregationContext,
        current_date: NaiveDate,
    ) -> Result<PlanningRequest, PlanGenerationError> {
        let context_json = context.to_json().map_err(|e| PlanGenerationError::Serialize {
            reason: e.to_string(),
        })?;

        Ok(PlanningRequest {
            request_id: Uuid::now_v7(),
            system: Some(SYSTEM_PROMPT.to_string()),
            prompt: build_instruction(&context_json, current_date),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        })
    }

    /// Ask the planning service for a weekly plan.
    ///
    /// The context is borrowed and never modified. No partially valid plan is
    /// ever returned: any transport, status, timeout or schema problem yields
    /// `PlanGenerationError`.
    pub async fn generate_plan(
        &self,
        context: &AggregationContext,
        current_date: NaiveDate,
    ) -> Result<WeeklyPlan, PlanGenerationError> {
        let request = self.build_request(context, current_date)?;
        let request_id = request.request_id;
        let timeout_ms = self.settings.timeout.as_millis() as u64;

        tracing::debug!(
            request_id = %request_id,
            provider = self.provider.provider_id(),
            model = self.provider.model_id(),
            clients = context.client_details.len(),
            pending_tasks = context.pending_tasks.len(),
            "Requesting weekly plan"
        );

        let call = self.provider.complete(request);
        let response = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(request_id = %request_id, error = %e, "Planning call failed");
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(request_id = %request_id, timeout_ms, "Planning call timed out");
                return Err(PlanGenerationError::Timeout { timeout_ms });
            }
        };

        self.usage
            .record(response.input_tokens, response.output_tokens);

        let plan = parse_plan(&response.text, current_date)
            .and_then(|plan| validate_client_refs(&plan, context).map(|()| plan))
            .map_err(|e| {
                tracing::warn!(request_id = %request_id, error = %e, "Planning response rejected");
                e
            })?;

        tracing::info!(
            request_id = %request_id,
            days = plan.day_count(),
            interactions = plan.interaction_count(),
            "Weekly plan generated"
        );
        Ok(plan)
    }
}

impl std::fmt::Debug for PlanGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanGenerator")
            .field("provider", &self.provider.provider_id())
            .field("model", &self.provider.model_id())
            .field("settings", &self.settings)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use agentdesk_test_utils::{fixtures, generators, MockPlanningProvider};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// The same context and date always yield the same instruction text.
        #[test]
        fn prop_request_prompt_is_deterministic(
            context in generators::arb_context(),
            offset in 0i64..3650,
        ) {
            let date =
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset);
            let generator = PlanGenerator::new(
                Arc::new(MockPlanningProvider::new(fixtures::plan_json_for_client(1))),
                PlannerSettings::default(),
            );
            let a = generator.build_request(&context, date).unwrap();
            let b = generator.build_request(&context, date).unwrap();
            prop_assert_eq!(a.prompt, b.prompt);
            prop_assert_ne!(a.request_id, b.request_id);
        }
    }
}
