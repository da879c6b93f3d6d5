//! Wire records returned by the backend data API.
//!
//! These mirror the backend's JSON (camelCase) and are deliberately lenient:
//! optional fields may be missing or `null`, nested collections default to
//! empty. Normalization into the planner's canonical shape happens in the
//! context builder, never here.

use crate::{ClientId, PolicyId, TaskId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// DECIMALS
// ============================================================================

/// The backend's "optional decimal" wrapper.
///
/// Monetary columns are serialized either as JSON numbers or as numeric
/// strings (`"500000.00"`), depending on the ORM path that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalValue {
    Number(f64),
    Text(String),
}

impl DecimalValue {
    /// Plain finite number, or `None` for unparseable text and non-finite values.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            DecimalValue::Number(n) => *n,
            DecimalValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for DecimalValue {
    fn from(value: f64) -> Self {
        DecimalValue::Number(value)
    }
}

/// Normalize an optional decimal field into `f64 | null`.
pub fn decimal_to_f64(value: Option<&DecimalValue>) -> Option<f64> {
    value.and_then(DecimalValue::to_f64)
}

// ============================================================================
// DASHBOARD SOURCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_clients: u64,
    pub active_policies: u64,
    #[serde(default)]
    pub total_premium: Option<DecimalValue>,
    #[serde(default)]
    pub upcoming_renewals: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTask {
    pub id: TaskId,
    pub description: String,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: i64,
    pub activity_type: String,
    pub description: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGoalRecord {
    #[serde(default)]
    pub annual_income_goal: Option<DecimalValue>,
    #[serde(default)]
    pub target_period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    pub month: String,
    pub count: u64,
}

// ============================================================================
// CLIENT ROSTER
// ============================================================================

/// One client with its nested policies, communications and tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<Timestamp>,
    #[serde(default)]
    pub annual_income: Option<DecimalValue>,
    #[serde(default)]
    pub dependents: Option<u32>,
    #[serde(default)]
    pub job_profile: Option<String>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub policies: Vec<PolicyRecord>,
    #[serde(default)]
    pub communications: Vec<CommunicationRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    pub id: PolicyId,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub premium: Option<DecimalValue>,
    #[serde(default)]
    pub sum_insured: Option<DecimalValue>,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
}

impl PolicyRecord {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationRecord {
    #[serde(rename = "type")]
    pub communication_type: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub description: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
}

// ============================================================================
// TASK CREATION
// ============================================================================

/// Body of the task-creation write endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub client_id: ClientId,
    pub description: String,
    pub due_date: NaiveDate,
    pub is_urgent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub id: TaskId,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub description: String,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub is_completed: bool,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_accepts_number_and_text() {
        let n: DecimalValue = serde_json::from_str("500000").unwrap();
        assert_eq!(n.to_f64(), Some(500000.0));

        let t: DecimalValue = serde_json::from_str("\"1250.50\"").unwrap();
        assert_eq!(t.to_f64(), Some(1250.5));

        let bad = DecimalValue::Text("n/a".to_string());
        assert_eq!(bad.to_f64(), None);
    }

    #[test]
    fn test_goal_with_null_decimal() {
        let goal: AgentGoalRecord =
            serde_json::from_str(r#"{"annualIncomeGoal": null, "targetPeriod": "2025-Q2"}"#)
                .unwrap();
        assert_eq!(decimal_to_f64(goal.annual_income_goal.as_ref()), None);
        assert_eq!(goal.target_period.as_deref(), Some("2025-Q2"));
    }

    #[test]
    fn test_client_record_defaults_nested_collections() {
        let client: ClientRecord =
            serde_json::from_str(r#"{"id": 7, "name": "Asha Rao"}"#).unwrap();
        assert!(client.policies.is_empty());
        assert!(client.communications.is_empty());
        assert!(client.tasks.is_empty());
        assert_eq!(client.annual_income, None);
    }

    #[test]
    fn test_communication_type_rename() {
        let comm: CommunicationRecord = serde_json::from_str(
            r#"{"type": "CALL", "timestamp": "2025-03-01T10:00:00Z",
                "summary": "Discussed renewal"}"#,
        )
        .unwrap();
        assert_eq!(comm.communication_type, "CALL");
    }

    #[test]
    fn test_create_task_request_wire_shape() {
        let req = CreateTaskRequest {
            client_id: 3,
            description: "Review term cover".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 4, 7).unwrap(),
            is_urgent: false,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["clientId"], 3);
        assert_eq!(value["dueDate"], "2025-04-07");
        assert_eq!(value["isUrgent"], false);
    }
}
