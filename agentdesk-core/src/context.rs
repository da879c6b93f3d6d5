//! Canonical aggregation context submitted to the planning service.
//!
//! Every field here is already normalized: decimals are plain numbers or
//! `null`, timestamps are reduced to what the planner needs. The shape is
//! serialized camelCase and embedded verbatim into the planning instruction.

use crate::{ClientId, PolicyId, TaskId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationContext {
    pub agent_context: AgentContext,
    pub client_details: Vec<ClientDetail>,
    pub pending_tasks: Vec<PendingTaskRef>,
}

impl AggregationContext {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn has_clients(&self) -> bool {
        !self.client_details.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub annual_income_goal: Option<f64>,
    pub target_period: Option<String>,
}

/// Read-only snapshot of one client as the planner sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    pub client_id: ClientId,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub annual_income: Option<f64>,
    pub dependents: Option<u32>,
    pub job_profile: Option<String>,
    pub marital_status: Option<String>,
    pub policies: Vec<PolicySummary>,
    pub communications: Vec<CommunicationSummary>,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub policy_id: PolicyId,
    pub product_name: Option<String>,
    pub status: String,
    pub premium: Option<f64>,
    pub sum_insured: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationSummary {
    #[serde(rename = "type")]
    pub communication_type: String,
    pub timestamp: Timestamp,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub description: String,
    pub is_completed: bool,
    pub is_urgent: bool,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTaskRef {
    pub id: TaskId,
    pub description: String,
    pub is_urgent: bool,
    pub due_date: Option<NaiveDate>,
    pub client_name: Option<String>,
}
