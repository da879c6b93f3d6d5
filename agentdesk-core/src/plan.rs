//! Structured weekly plan returned by the planning service.
//!
//! Unknown fields are rejected at deserialization: the planning service must
//! return exactly this schema.

use crate::ClientId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound on `dailyPlan` entries.
pub const MAX_PLAN_DAYS: usize = 7;

/// Weekly goal returned when the roster has no clients.
pub const EMPTY_ROSTER_GOAL: &str = "Build initial lead pipeline.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeeklyPlan {
    pub weekly_goal: String,
    pub daily_plan: Vec<DayPlan>,
}

impl WeeklyPlan {
    /// The degenerate plan for an empty client roster.
    pub fn empty_roster() -> Self {
        Self {
            weekly_goal: EMPTY_ROSTER_GOAL.to_string(),
            daily_plan: Vec::new(),
        }
    }

    pub fn day_count(&self) -> usize {
        self.daily_plan.len()
    }

    pub fn interaction_count(&self) -> usize {
        self.daily_plan
            .iter()
            .map(|day| day.client_interactions.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DayPlan {
    pub day: String,
    pub date: NaiveDate,
    pub theme: String,
    pub client_interactions: Vec<ClientInteraction>,
    pub general_tasks: Vec<String>,
}

/// One suggested, client-specific outreach action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientInteraction {
    pub client_name: String,
    pub client_id: ClientId,
    pub objective: String,
    pub interaction_mode: String,
    pub talking_points: String,
    pub products_to_focus_on: Vec<String>,
    pub rationale: String,
}
