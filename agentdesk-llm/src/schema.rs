//! Strict parsing and validation of planning responses.
//!
//! A response is adopted only if the whole body parses as a `WeeklyPlan` and
//! every field passes validation. Anything else is a uniform schema error.

use agentdesk_core::{AggregationContext, ClientId, PlanGenerationError, WeeklyPlan, MAX_PLAN_DAYS};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Parse the raw response body into a validated plan.
///
/// Surrounding whitespace is tolerated; any other leading or trailing text
/// (prose, markdown fences) is rejected.
pub fn parse_plan(raw: &str, current_date: NaiveDate) -> Result<WeeklyPlan, PlanGenerationError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(PlanGenerationError::schema("empty response body"));
    }
    if !body.starts_with('{') {
        return Err(PlanGenerationError::schema(
            "response must be a bare JSON object without leading text",
        ));
    }

    let plan: WeeklyPlan = serde_json::from_str(body)
        .map_err(|e| PlanGenerationError::schema(format!("invalid plan JSON: {}", e)))?;

    validate_plan(&plan, current_date)?;
    Ok(plan)
}

/// Field-level validation of an already-deserialized plan.
pub fn validate_plan(
    plan: &WeeklyPlan,
    current_date: NaiveDate,
) -> Result<(), PlanGenerationError> {
    if plan.weekly_goal.trim().is_empty() {
        return Err(PlanGenerationError::schema("weeklyGoal is empty"));
    }
    if plan.daily_plan.len() > MAX_PLAN_DAYS {
        return Err(PlanGenerationError::schema(format!(
            "dailyPlan has {} entries, at most {} allowed",
            plan.daily_plan.len(),
            MAX_PLAN_DAYS
        )));
    }

    let mut previous: Option<NaiveDate> = None;
    for (index, day) in plan.daily_plan.iter().enumerate() {
        if day.day.trim().is_empty() {
            return Err(PlanGenerationError::schema(format!("dailyPlan[{}].day is empty", index)));
        }
        if day.theme.trim().is_empty() {
            return Err(PlanGenerationError::schema(format!(
                "dailyPlan[{}].theme is empty",
                index
            )));
        }
        if day.date < current_date {
            return Err(PlanGenerationError::schema(format!(
                "dailyPlan[{}].date {} is before {}",
                index, day.date, current_date
            )));
        }
        if let Some(prev) = previous {
            if day.date <= prev {
                return Err(PlanGenerationError::schema(format!(
                    "dailyPlan[{}].date {} is not after {}",
                    index, day.date, prev
                )));
            }
        }
        previous = Some(day.date);

        for (slot, interaction) in day.client_interactions.iter().enumerate() {
            let field = |name: &str| {
                format!("dailyPlan[{}].clientInteractions[{}].{}", index, slot, name)
            };
            if interaction.client_name.trim().is_empty() {
                let message = format!("{} is empty", field("clientName"));
                return Err(PlanGenerationError::schema(message));
            }
            if interaction.objective.trim().is_empty() {
                return Err(PlanGenerationError::schema(format!("{} is empty", field("objective"))));
            }
            if interaction.interaction_mode.trim().is_empty() {
                return Err(PlanGenerationError::schema(format!(
                    "{} is empty",
                    field("interactionMode")
                )));
            }
        }
    }

    Ok(())
}

/// Reject plans that reference clients absent from the submitted context.
pub fn validate_client_refs(
    plan: &WeeklyPlan,
    context: &AggregationContext,
) -> Result<(), PlanGenerationError> {
    let known: HashSet<ClientId> = context
        .client_details
        .iter()
        .map(|client| client.client_id)
        .collect();

    for day in &plan.daily_plan {
        for interaction in &day.client_interactions {
            if !known.contains(&interaction.client_id) {
                return Err(PlanGenerationError::schema(format!(
                    "interaction on {} references unknown clientId {}",
                    day.date, interaction.client_id
                )));
            }
        }
    }
    Ok(())
}
