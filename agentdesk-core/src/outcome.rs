//! Per-source outcomes of one aggregation cycle.

use crate::error::SourceFetchError;
use crate::records::{
    ActivityItem, AgentGoalRecord, ClientRecord, DashboardMetrics, MonthlySales, PendingTask,
};
use crate::Generation;
use serde::{Deserialize, Serialize};

/// The six independent backend reads feeding the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    Metrics,
    PendingTasks,
    ActivityFeed,
    AgentGoal,
    ClientRoster,
    SalesPerformance,
}

impl SourceKind {
    /// All sources in the order they are reported.
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Metrics,
        SourceKind::PendingTasks,
        SourceKind::ActivityFeed,
        SourceKind::AgentGoal,
        SourceKind::ClientRoster,
        SourceKind::SalesPerformance,
    ];

    /// Sources the planner cannot run without.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, SourceKind::AgentGoal | SourceKind::ClientRoster)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Metrics => "metrics",
            SourceKind::PendingTasks => "pending tasks",
            SourceKind::ActivityFeed => "activity feed",
            SourceKind::AgentGoal => "agent goal",
            SourceKind::ClientRoster => "client roster",
            SourceKind::SalesPerformance => "sales performance",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settled result of one source fetch. Immutable once settled.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Ok(T),
    Failed(SourceFetchError),
}

impl<T> SourceOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceOutcome::Ok(_))
    }

    pub fn is_failed(&self) -> bool {
        !self.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SourceOutcome::Ok(value) => Some(value),
            SourceOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SourceFetchError> {
        match self {
            SourceOutcome::Ok(_) => None,
            SourceOutcome::Failed(err) => Some(err),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            SourceOutcome::Ok(value) => Some(value),
            SourceOutcome::Failed(_) => None,
        }
    }
}

impl<T> From<Result<T, SourceFetchError>> for SourceOutcome<T> {
    fn from(result: Result<T, SourceFetchError>) -> Self {
        match result {
            Ok(value) => SourceOutcome::Ok(value),
            Err(err) => SourceOutcome::Failed(err),
        }
    }
}

/// The six settled outcomes of one aggregation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub generation: Generation,
    pub metrics: SourceOutcome<DashboardMetrics>,
    pub pending_tasks: SourceOutcome<Vec<PendingTask>>,
    pub activity_feed: SourceOutcome<Vec<ActivityItem>>,
    pub agent_goal: SourceOutcome<AgentGoalRecord>,
    pub client_roster: SourceOutcome<Vec<ClientRecord>>,
    pub sales_performance: SourceOutcome<Vec<MonthlySales>>,
}

impl AggregationResult {
    /// Error recorded for `kind`, if that source failed.
    pub fn error_for(&self, kind: SourceKind) -> Option<&SourceFetchError> {
        match kind {
            SourceKind::Metrics => self.metrics.error(),
            SourceKind::PendingTasks => self.pending_tasks.error(),
            SourceKind::ActivityFeed => self.activity_feed.error(),
            SourceKind::AgentGoal => self.agent_goal.error(),
            SourceKind::ClientRoster => self.client_roster.error(),
            SourceKind::SalesPerformance => self.sales_performance.error(),
        }
    }

    pub fn succeeded(&self, kind: SourceKind) -> bool {
        self.error_for(kind).is_none()
    }

    /// All failures, in `SourceKind::ALL` order.
    pub fn failures(&self) -> Vec<&SourceFetchError> {
        SourceKind::ALL
            .iter()
            .filter_map(|kind| self.error_for(*kind))
            .collect()
    }

    pub fn failed_sources(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .iter()
            .copied()
            .filter(|kind| !self.succeeded(*kind))
            .collect()
    }

    /// Message of the first failure in `SourceKind::ALL` order, surfaced
    /// verbatim as the non-fatal refresh warning.
    pub fn first_failure_message(&self) -> Option<String> {
        self.failures().first().map(|err| err.to_string())
    }

    pub fn all_succeeded(&self) -> bool {
        SourceKind::ALL.iter().all(|kind| self.succeeded(*kind))
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use proptest::prelude::*;

    fn outcome<T>(value: T, kind: SourceKind, fail: bool) -> SourceOutcome<T> {
        if fail {
            SourceOutcome::Failed(SourceFetchError::new(kind, FetchErrorKind::Timeout, "slow"))
        } else {
            SourceOutcome::Ok(value)
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// For any failing subset, exactly that subset is reported, in source order.
        #[test]
        fn prop_failed_sources_match_mask(mask in 0u8..64u8) {
            let fails = |i: usize| mask & (1 << i) != 0;
            let result = AggregationResult {
                generation: 9,
                metrics: outcome(
                    DashboardMetrics {
                        total_clients: 1,
                        active_policies: 1,
                        total_premium: None,
                        upcoming_renewals: 0,
                    },
                    SourceKind::Metrics,
                    fails(0),
                ),
                pending_tasks: outcome(vec![], SourceKind::PendingTasks, fails(1)),
                activity_feed: outcome(vec![], SourceKind::ActivityFeed, fails(2)),
                agent_goal: outcome(
                    AgentGoalRecord { annual_income_goal: None, target_period: None },
                    SourceKind::AgentGoal,
                    fails(3),
                ),
                client_roster: outcome(vec![], SourceKind::ClientRoster, fails(4)),
                sales_performance: outcome(vec![], SourceKind::SalesPerformance, fails(5)),
            };

            let expected: Vec<SourceKind> = SourceKind::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| fails(*i))
                .map(|(_, k)| *k)
                .collect();

            prop_assert_eq!(result.failed_sources(), expected.clone());
            prop_assert_eq!(result.first_failure_message().is_some(), !expected.is_empty());
            for kind in SourceKind::ALL {
                prop_assert_eq!(result.succeeded(kind), !expected.contains(&kind));
            }
        }
    }
}
