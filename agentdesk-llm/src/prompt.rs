//! Instruction template for the weekly planning call.
//!
//! The instruction is a pure function of the serialized context and the
//! pinned current date, so identical inputs always produce identical prompts.

use agentdesk_core::EMPTY_ROSTER_GOAL;
use chrono::{Datelike, Duration, NaiveDate};

/// System framing sent alongside every planning instruction.
pub const SYSTEM_PROMPT: &str = "You are a planning assistant for an insurance agent. \
You answer with a single JSON object and nothing else: no markdown code fences, \
no explanations, no text before or after the JSON.";

/// The Monday strictly after `today`.
pub fn next_monday(today: NaiveDate) -> NaiveDate {
    let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
    today + Duration::days(days_ahead)
}

/// Build the full planning instruction.
///
/// `context_json` is the serialized `AggregationContext`; it is embedded
/// verbatim after the rules.
pub fn build_instruction(context_json: &str, current_date: NaiveDate) -> String {
    let monday = next_monday(current_date);
    let friday = monday + Duration::days(4);

    format!(
        "Today is {today_name}, {today}. Treat this date as fixed; do not use any other \
         notion of today.\n\
         Plan the agent's week starting next Monday, {monday}, through Friday, {friday}.\n\
         \n\
         Use the agent context, client details and pending tasks below to produce a weekly \
         activity plan that moves the agent toward the annual income goal. Prioritize clients \
         with upcoming or overdue renewals, coverage gaps relative to income and dependents, \
         and clients without recent communication. Fold urgent pending tasks into the days \
         they belong to.\n\
         \n\
         Output rules:\n\
         1. Respond with pure JSON only. Do not wrap it in markdown fences. Do not add any prose \
         before or after it.\n\
         2. The JSON must match this schema exactly, with no additional fields:\n\
         {schema}\n\
         3. \"dailyPlan\" holds at most 7 entries in ascending date order; \"date\" is YYYY-MM-DD \
         and \"day\" is the English weekday name of that date.\n\
         4. \"clientId\" and \"clientName\" must be copied from clientDetails. Never invent \
         clients.\n\
         5. If clientDetails is empty, respond with exactly \
         {{\"weeklyGoal\":\"{empty_goal}\",\"dailyPlan\":[]}}.\n\
         \n\
         Context:\n\
         {context}",
        today_name = current_date.format("%A"),
        today = current_date.format("%Y-%m-%d"),
        monday = monday.format("%Y-%m-%d"),
        friday = friday.format("%Y-%m-%d"),
        schema = PLAN_SCHEMA,
        empty_goal = EMPTY_ROSTER_GOAL,
        context = context_json,
    )
}

/// Textual schema shown to the planning service.
const PLAN_SCHEMA: &str = r#"{
  "weeklyGoal": string,
  "dailyPlan": [
    {
      "day": string,
      "date": "YYYY-MM-DD",
      "theme": string,
      "clientInteractions": [
        {
          "clientName": string,
          "clientId": integer,
          "objective": string,
          "interactionMode": string,
          "talkingPoints": string,
          "productsToFocusOn": [string],
          "rationale": string
        }
      ],
      "generalTasks": [string]
    }
  ]
}"#;
