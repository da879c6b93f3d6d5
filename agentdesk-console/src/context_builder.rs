//! Builds the canonical planning context from a settled aggregation.
//!
//! Pure functions over borrowed input. Only `AgentGoal`, `ClientRoster` and
//! `PendingTasks` contribute; the other three sources feed the dashboard
//! only.

use agentdesk_core::{
    decimal_to_f64, AgentContext, AgentGoalRecord, AggregationContext, AggregationResult,
    ClientDetail, ClientRecord, CommunicationSummary, ContextIncompleteError, PendingTask,
    PendingTaskRef, PolicySummary, TaskSummary, Timestamp,
};
use chrono::NaiveDate;

/// Classify the mandatory sources. `Ok(())` means planning may proceed.
pub fn check_mandatory(result: &AggregationResult) -> Result<(), ContextIncompleteError> {
    let goal_ok = result.agent_goal.is_ok();
    let roster_ok = result.client_roster.is_ok();
    match ContextIncompleteError::from_flags(goal_ok, roster_ok) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Build the planning context, or `None` when either mandatory source failed.
///
/// A failed `PendingTasks` source contributes an empty list.
pub fn build_context(result: &AggregationResult) -> Option<AggregationContext> {
    let goal = result.agent_goal.value()?;
    let roster = result.client_roster.value()?;
    let pending: Vec<PendingTaskRef> = result
        .pending_tasks
        .value()
        .map(|tasks| tasks.iter().map(pending_task_ref).collect())
        .unwrap_or_default();

    Some(AggregationContext {
        agent_context: agent_context(goal),
        client_details: roster.iter().map(client_detail).collect(),
        pending_tasks: pending,
    })
}

fn agent_context(goal: &AgentGoalRecord) -> AgentContext {
    AgentContext {
        annual_income_goal: decimal_to_f64(goal.annual_income_goal.as_ref()),
        target_period: goal.target_period.clone(),
    }
}

fn to_date(timestamp: Option<Timestamp>) -> Option<NaiveDate> {
    timestamp.map(|ts| ts.date_naive())
}

fn client_detail(client: &ClientRecord) -> ClientDetail {
    let mut communications: Vec<CommunicationSummary> = client
        .communications
        .iter()
        .map(|comm| CommunicationSummary {
            communication_type: comm.communication_type.clone(),
            timestamp: comm.timestamp,
            summary: comm.summary.clone(),
        })
        .collect();
    // newest first
    communications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    ClientDetail {
        client_id: client.id,
        name: client.name.clone(),
        date_of_birth: to_date(client.date_of_birth),
        annual_income: decimal_to_f64(client.annual_income.as_ref()),
        dependents: client.dependents,
        job_profile: client.job_profile.clone(),
        marital_status: client.marital_status.clone(),
        policies: client
            .policies
            .iter()
            .map(|policy| PolicySummary {
                policy_id: policy.id,
                product_name: policy.product_name.clone(),
                status: policy.status.clone(),
                premium: decimal_to_f64(policy.premium.as_ref()),
                sum_insured: decimal_to_f64(policy.sum_insured.as_ref()),
                start_date: to_date(policy.start_date),
                end_date: to_date(policy.end_date),
            })
            .collect(),
        communications,
        tasks: client
            .tasks
            .iter()
            .map(|task| TaskSummary {
                description: task.description.clone(),
                is_completed: task.is_completed,
                is_urgent: task.is_urgent,
                due_date: to_date(task.due_date),
            })
            .collect(),
    }
}

fn pending_task_ref(task: &PendingTask) -> PendingTaskRef {
    PendingTaskRef {
        id: task.id,
        description: task.description.clone(),
        is_urgent: task.is_urgent,
        due_date: to_date(task.due_date),
        client_name: task.client_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_core::{
        DecimalValue, FetchErrorKind, SourceFetchError, SourceKind, SourceOutcome,
    };
    use agentdesk_test_utils::fixtures;

    fn settled() -> AggregationResult {
        AggregationResult {
            generation: 1,
            metrics: SourceOutcome::Ok(fixtures::metrics()),
            pending_tasks: SourceOutcome::Ok(vec![fixtures::urgent_pending_task()]),
            activity_feed: SourceOutcome::Ok(fixtures::activity_feed()),
            agent_goal: SourceOutcome::Ok(fixtures::agent_goal()),
            client_roster: SourceOutcome::Ok(vec![fixtures::client_with_overdue_renewal()]),
            sales_performance: SourceOutcome::Ok(fixtures::sales_performance()),
        }
    }

    fn failed<T>(kind: SourceKind) -> SourceOutcome<T> {
        SourceOutcome::Failed(SourceFetchError::new(kind, FetchErrorKind::Transport, "down"))
    }

    #[test]
    fn test_decimal_goal_normalized() {
        let context = build_context(&settled()).unwrap();
        assert_eq!(context.agent_context.annual_income_goal, Some(500000.0));
        assert_eq!(context.agent_context.target_period.as_deref(), Some("2025-Q2"));
    }

    #[test]
    fn test_unparseable_decimal_becomes_null() {
        let mut result = settled();
        result.agent_goal = SourceOutcome::Ok(AgentGoalRecord {
            annual_income_goal: Some(DecimalValue::Text("n/a".to_string())),
            target_period: None,
        });
        let context = build_context(&result).unwrap();
        assert_eq!(context.agent_context.annual_income_goal, None);
    }

    #[test]
    fn test_client_fields_normalized() {
        let context = build_context(&settled()).unwrap();
        let client = &context.client_details[0];
        assert_eq!(client.client_id, 1);
        assert_eq!(client.annual_income, Some(1_200_000.0));
        assert_eq!(client.policies[0].premium, Some(12000.0));
        assert_eq!(client.policies[0].end_date, Some(fixtures::date(2025, 3, 25)));
        assert_eq!(client.date_of_birth, Some(fixtures::date(1985, 6, 14)));
    }

    #[test]
    fn test_communications_newest_first_without_mutating_input() {
        let result = settled();
        let before = result.clone();
        let context = build_context(&result).unwrap();
        let comms = &context.client_details[0].communications;
        assert!(comms[0].timestamp > comms[1].timestamp);
        assert_eq!(result, before);
    }

    #[test]
    fn test_failed_pending_tasks_yield_empty_slice() {
        let mut result = settled();
        result.pending_tasks = failed(SourceKind::PendingTasks);
        let context = build_context(&result).unwrap();
        assert!(context.pending_tasks.is_empty());
        assert_eq!(context.client_details.len(), 1);
    }

    #[test]
    fn test_optional_sources_do_not_matter() {
        let mut result = settled();
        result.metrics = failed(SourceKind::Metrics);
        result.activity_feed = failed(SourceKind::ActivityFeed);
        result.sales_performance = failed(SourceKind::SalesPerformance);
        assert!(build_context(&result).is_some());
        assert!(check_mandatory(&result).is_ok());
    }

    #[test]
    fn test_missing_goal() {
        let mut result = settled();
        result.agent_goal = failed(SourceKind::AgentGoal);
        assert!(build_context(&result).is_none());
        assert_eq!(check_mandatory(&result), Err(ContextIncompleteError::GoalUnavailable));
    }

    #[test]
    fn test_missing_roster() {
        let mut result = settled();
        result.client_roster = failed(SourceKind::ClientRoster);
        assert!(build_context(&result).is_none());
        assert_eq!(check_mandatory(&result), Err(ContextIncompleteError::ClientsUnavailable));
    }

    #[test]
    fn test_missing_both() {
        let mut result = settled();
        result.agent_goal = failed(SourceKind::AgentGoal);
        result.client_roster = failed(SourceKind::ClientRoster);
        assert!(build_context(&result).is_none());
        assert_eq!(check_mandatory(&result), Err(ContextIncompleteError::BothUnavailable));
    }

    #[test]
    fn test_empty_roster_builds_empty_client_list() {
        let mut result = settled();
        result.client_roster = SourceOutcome::Ok(vec![]);
        let context = build_context(&result).unwrap();
        assert!(!context.has_clients());
    }
}
