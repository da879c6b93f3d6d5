//! KPI cards and coverage breakdown derived from the client roster.

use agentdesk_core::{decimal_to_f64, ClientRecord, PolicyRecord};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Days ahead of `today` that count as "due for renewal".
pub const RENEWAL_WINDOW_DAYS: i64 = 30;

const UNSPECIFIED_PRODUCT: &str = "Unspecified";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_clients: usize,
    pub active_policies: usize,
    pub total_annual_premium: f64,
    pub total_sum_insured: f64,
    /// Active policies ending within the renewal window, today included.
    pub renewals_due_30d: usize,
    /// Policies marked lapsed, plus active policies already past their end date.
    pub lapsed_policies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCoverage {
    pub product_name: String,
    pub policy_count: usize,
    pub client_count: usize,
    pub total_premium: f64,
    pub total_sum_insured: f64,
}

pub fn summarize(clients: &[ClientRecord], today: NaiveDate) -> KpiSummary {
    let window_end = today + Duration::days(RENEWAL_WINDOW_DAYS);
    let mut summary = KpiSummary {
        total_clients: clients.len(),
        ..KpiSummary::default()
    };

    for policy in clients.iter().flat_map(|c| c.policies.iter()) {
        let end = policy.end_date.map(|ts| ts.date_naive());

        if is_lapsed(policy, end, today) {
            summary.lapsed_policies += 1;
            continue;
        }
        if !policy.is_active() {
            continue;
        }

        summary.active_policies += 1;
        summary.total_annual_premium += amount(policy.premium.as_ref());
        summary.total_sum_insured += amount(policy.sum_insured.as_ref());
        if matches!(end, Some(end) if end >= today && end <= window_end) {
            summary.renewals_due_30d += 1;
        }
    }

    summary
}

/// Active-policy totals grouped by product name, sorted by name.
pub fn coverage_by_product(clients: &[ClientRecord]) -> Vec<ProductCoverage> {
    struct Totals {
        policies: usize,
        clients: BTreeSet<i64>,
        premium: f64,
        sum_insured: f64,
    }

    let mut grouped: BTreeMap<String, Totals> = BTreeMap::new();
    for client in clients {
        for policy in client.policies.iter().filter(|p| p.is_active()) {
            let name = policy
                .product_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(UNSPECIFIED_PRODUCT)
                .to_string();
            let totals = grouped.entry(name).or_insert_with(|| Totals {
                policies: 0,
                clients: BTreeSet::new(),
                premium: 0.0,
                sum_insured: 0.0,
            });
            totals.policies += 1;
            totals.clients.insert(client.id);
            totals.premium += amount(policy.premium.as_ref());
            totals.sum_insured += amount(policy.sum_insured.as_ref());
        }
    }

    grouped
        .into_iter()
        .map(|(product_name, totals)| ProductCoverage {
            product_name,
            policy_count: totals.policies,
            client_count: totals.clients.len(),
            total_premium: totals.premium,
            total_sum_insured: totals.sum_insured,
        })
        .collect()
}

fn is_lapsed(policy: &PolicyRecord, end: Option<NaiveDate>, today: NaiveDate) -> bool {
    if policy.status.eq_ignore_ascii_case("lapsed") {
        return true;
    }
    policy.is_active() && matches!(end, Some(end) if end < today)
}

fn amount(value: Option<&agentdesk_core::DecimalValue>) -> f64 {
    decimal_to_f64(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_core::DecimalValue;
    use agentdesk_test_utils::fixtures;

    fn policy(
        id: i64,
        product: &str,
        status: &str,
        premium: f64,
        end: Option<NaiveDate>,
    ) -> PolicyRecord {
        PolicyRecord {
            id,
            policy_number: None,
            product_name: Some(product.to_string()),
            status: status.to_string(),
            premium: Some(DecimalValue::Number(premium)),
            sum_insured: Some(DecimalValue::Text(format!("{:.2}", premium * 100.0))),
            start_date: None,
            end_date: end.map(|d| d.and_hms_opt(9, 0, 0).unwrap().and_utc()),
        }
    }

    fn client(id: i64, policies: Vec<PolicyRecord>) -> ClientRecord {
        let mut record = fixtures::client_with_overdue_renewal();
        record.id = id;
        record.policies = policies;
        record
    }

    #[test]
    fn test_empty_roster() {
        let summary = summarize(&[], fixtures::reference_date());
        assert_eq!(summary, KpiSummary::default());
        assert!(coverage_by_product(&[]).is_empty());
    }

    #[test]
    fn test_overdue_active_policy_counts_as_lapsed() {
        let roster = vec![fixtures::client_with_overdue_renewal()];
        let summary = summarize(&roster, fixtures::reference_date());
        assert_eq!(summary.total_clients, 1);
        assert_eq!(summary.lapsed_policies, 1);
        assert_eq!(summary.active_policies, 0);
        assert_eq!(summary.renewals_due_30d, 0);
    }

    #[test]
    fn test_renewal_window_and_totals() {
        let today = fixtures::reference_date();
        let roster = vec![
            client(
                1,
                vec![
                    policy(1, "Term Life", "Active", 1000.0, Some(today + Duration::days(10))),
                    policy(2, "Health", "Active", 500.0, Some(today + Duration::days(31))),
                    policy(3, "Health", "Lapsed", 900.0, None),
                ],
            ),
            client(2, vec![policy(4, "Health", "active", 250.0, Some(today))]),
        ];

        let summary = summarize(&roster, today);
        assert_eq!(summary.active_policies, 3);
        assert_eq!(summary.lapsed_policies, 1);
        assert_eq!(summary.renewals_due_30d, 2);
        assert_eq!(summary.total_annual_premium, 1750.0);
        assert_eq!(summary.total_sum_insured, 175_000.0);
    }

    #[test]
    fn test_coverage_sorted_and_grouped() {
        let roster = vec![
            client(
                1,
                vec![
                    policy(1, "Term Life", "Active", 100.0, None),
                    policy(2, "Health", "Active", 50.0, None),
                ],
            ),
            client(
                2,
                vec![
                    policy(3, "Health", "Active", 70.0, None),
                    policy(4, "Health", "Cancelled", 10.0, None),
                ],
            ),
        ];
        let coverage = coverage_by_product(&roster);
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[0].product_name, "Health");
        assert_eq!(coverage[0].policy_count, 2);
        assert_eq!(coverage[0].client_count, 2);
        assert_eq!(coverage[0].total_premium, 120.0);
        assert_eq!(coverage[1].product_name, "Term Life");
    }

    #[test]
    fn test_missing_product_name_grouped_as_unspecified() {
        let mut unnamed = policy(1, "", "Active", 10.0, None);
        unnamed.product_name = None;
        let coverage = coverage_by_product(&[client(1, vec![unnamed])]);
        assert_eq!(coverage[0].product_name, "Unspecified");
    }

    #[test]
    fn test_unparseable_amounts_count_as_zero() {
        let mut odd = policy(1, "Motor", "Active", 0.0, None);
        odd.premium = Some(DecimalValue::Text("tbd".to_string()));
        let summary = summarize(&[client(1, vec![odd])], fixtures::reference_date());
        assert_eq!(summary.active_policies, 1);
        assert_eq!(summary.total_annual_premium, 0.0);
    }
}
