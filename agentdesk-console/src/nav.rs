//! Day selection within an adopted weekly plan.

use agentdesk_core::{DayPlan, WeeklyPlan};

/// Select the day at `index`, clamped into `[0, len - 1]`.
///
/// Returns `None` only when the plan has no days.
pub fn select_day(plan: &WeeklyPlan, index: usize) -> Option<&DayPlan> {
    let last = plan.daily_plan.len().checked_sub(1)?;
    plan.daily_plan.get(index.min(last))
}

/// Requested day index as a cursor position; anything below zero is the
/// first day.
pub fn day_index(requested: i64) -> usize {
    usize::try_from(requested.max(0)).unwrap_or(usize::MAX)
}

/// Single cursor over the days of the current plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanNavigator {
    cursor: usize,
}

impl PlanNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Called whenever a new plan is adopted.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn select<'a>(&mut self, plan: &'a WeeklyPlan, index: usize) -> Option<&'a DayPlan> {
        self.cursor = clamp(plan, index);
        select_day(plan, self.cursor)
    }

    pub fn current<'a>(&self, plan: &'a WeeklyPlan) -> Option<&'a DayPlan> {
        select_day(plan, self.cursor)
    }

    /// Move forward one day, stopping at the last day.
    pub fn next<'a>(&mut self, plan: &'a WeeklyPlan) -> Option<&'a DayPlan> {
        self.select(plan, self.cursor.saturating_add(1))
    }

    /// Move back one day, stopping at the first day.
    pub fn previous<'a>(&mut self, plan: &'a WeeklyPlan) -> Option<&'a DayPlan> {
        self.select(plan, self.cursor.saturating_sub(1))
    }
}

fn clamp(plan: &WeeklyPlan, index: usize) -> usize {
    index.min(plan.daily_plan.len().saturating_sub(1))
}
