//! Dashboard bucketing: KPIs and chart-ready monthly series over a date range.
//!
//! Everything here is a pure fold over already-normalised entities. "No data"
//! and "failed fetch" look the same from this side: an empty slice, which
//! yields an all-zero snapshot.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Fund, MoneyCents, Movement, MovementKind, Project, ResultEngine,
    dates::parse_date,
    labels::{normalize_display, normalize_key},
    periods::{MonthKey, build_periods},
};

/// Label for paid outgoing movements with a blank category.
pub const UNCATEGORIZED_LABEL: &str = "no category";

/// Inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// January 1st of `today`'s year through `today`.
    pub fn year_to_date(today: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        Self { start, end: today }
    }

    /// Range from optional raw bounds; missing bounds default to
    /// [`year_to_date`](Self::year_to_date).
    pub fn resolve(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> ResultEngine<Self> {
        let fallback = Self::year_to_date(today);
        let bound = |raw: Option<&str>, default: NaiveDate| match raw.map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => {
                parse_date(raw).ok_or_else(|| EngineError::InvalidDate(format!("invalid date: {raw}")))
            }
        };
        Ok(Self {
            start: bound(start, fallback.start)?,
            end: bound(end, fallback.end)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Month keys covered by the range.
    pub fn periods(&self) -> Vec<MonthKey> {
        build_periods(self.start, self.end)
    }
}

/// A planned amount for one month, optionally scoped to a fund or project.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetItem {
    pub id: String,
    pub fund_id: Option<String>,
    pub project_id: Option<String>,
    /// `None` when the row carried no usable month; such items are ignored.
    pub month: Option<MonthKey>,
    pub planned_amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CashFlowPoint {
    pub period: MonthKey,
    pub incoming: MoneyCents,
    pub outgoing: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetPoint {
    pub period: MonthKey,
    pub budgeted: MoneyCents,
    pub actual: MoneyCents,
}

/// Derived, non-persisted dashboard state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSnapshot {
    pub incoming_total: MoneyCents,
    pub outgoing_total: MoneyCents,
    pub current_balance: MoneyCents,
    pub pending_total: MoneyCents,
    pub cash_flow_series: Vec<CashFlowPoint>,
    pub category_distribution: Vec<CategoryAmount>,
    pub budget_vs_actual_series: Vec<BudgetPoint>,
}

/// Inputs of [`build_dashboard`].
#[derive(Clone, Copy, Debug)]
pub struct DashboardInput<'a> {
    /// Funds already folded by [`aggregate_funds`](crate::aggregate_funds).
    pub funds: &'a [Fund],
    /// Every movement; paid/pending views are derived here.
    pub movements: &'a [Movement],
    pub range: DateRange,
    /// Budget spread evenly across the range when no budget items exist.
    pub planned_total: MoneyCents,
    /// Real per-month planned amounts; replaces the even split when non-empty.
    pub budget_items: &'a [BudgetItem],
}

/// Total planned budget: the funds' budgets, or the projects' budgets when no
/// fund is configured.
pub fn planned_total(funds: &[Fund], projects: &[Project]) -> MoneyCents {
    if funds.is_empty() {
        projects.iter().map(|p| p.budgeted_total).sum()
    } else {
        funds.iter().map(|f| f.budgeted_total).sum()
    }
}

/// Builds the dashboard snapshot for `input.range`.
pub fn build_dashboard(input: DashboardInput<'_>) -> DashboardSnapshot {
    let range = input.range;
    let periods = range.periods();

    let in_range: Vec<&Movement> = input
        .movements
        .iter()
        .filter(|m| !m.date_defaulted && range.contains(m.date))
        .collect();

    let mut snapshot = DashboardSnapshot::default();
    let mut cash_flow: BTreeMap<MonthKey, (MoneyCents, MoneyCents)> = periods
        .iter()
        .map(|period| (*period, (MoneyCents::ZERO, MoneyCents::ZERO)))
        .collect();
    let mut categories = CategoryTotals::default();

    for movement in &in_range {
        if movement.counts_as_pending() {
            snapshot.pending_total += movement.total_value;
        }
        if !movement.is_paid() {
            continue;
        }

        let bucket = cash_flow
            .entry(MonthKey::of(movement.date))
            .or_insert((MoneyCents::ZERO, MoneyCents::ZERO));
        match movement.kind {
            MovementKind::Incoming => {
                snapshot.incoming_total += movement.total_value;
                bucket.0 += movement.total_value;
            }
            MovementKind::Outgoing => {
                snapshot.outgoing_total += movement.total_value;
                bucket.1 += movement.total_value;
                categories.add(&movement.category, movement.total_value);
            }
        }
    }

    snapshot.current_balance = if input.funds.is_empty() {
        snapshot.incoming_total - snapshot.outgoing_total
    } else {
        input.funds.iter().map(|f| f.current_balance).sum()
    };

    snapshot.cash_flow_series = cash_flow
        .iter()
        .map(|(period, (incoming, outgoing))| CashFlowPoint {
            period: *period,
            incoming: *incoming,
            outgoing: *outgoing,
        })
        .collect();

    snapshot.category_distribution = categories.into_sorted();

    let budgeted = budget_per_period(&periods, input.planned_total, input.budget_items);
    snapshot.budget_vs_actual_series = periods
        .iter()
        .zip(budgeted)
        .map(|(period, budgeted)| BudgetPoint {
            period: *period,
            budgeted,
            actual: cash_flow
                .get(period)
                .map(|(_, outgoing)| *outgoing)
                .unwrap_or_default(),
        })
        .collect();

    snapshot
}

/// Planned amount per period: real budget items when available, otherwise
/// the total split evenly (remainder cents go to the earliest periods so the
/// series sums to the total).
fn budget_per_period(
    periods: &[MonthKey],
    planned_total: MoneyCents,
    items: &[BudgetItem],
) -> Vec<MoneyCents> {
    if !items.is_empty() {
        let mut per_month: HashMap<MonthKey, MoneyCents> = HashMap::new();
        for item in items {
            if let Some(month) = item.month {
                *per_month.entry(month).or_default() += item.planned_amount;
            }
        }
        return periods
            .iter()
            .map(|period| per_month.get(period).copied().unwrap_or_default())
            .collect();
    }

    let Ok(count) = i64::try_from(periods.len()) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let total = planned_total.cents();
    let base = total / count;
    let remainder = total % count;
    (0..count)
        .map(|index| {
            let extra = if index < remainder.abs() {
                remainder.signum()
            } else {
                0
            };
            MoneyCents::new(base + extra)
        })
        .collect()
}

/// Category sums grouped by accent/case-insensitive key, displayed with the
/// first label seen.
#[derive(Default)]
struct CategoryTotals {
    order: Vec<String>,
    by_key: HashMap<String, CategoryAmount>,
}

impl CategoryTotals {
    fn add(&mut self, raw: &str, amount: MoneyCents) {
        let (key, label) = match (normalize_key(raw), normalize_display(raw)) {
            (Some(key), Some(label)) => (key, label),
            _ => (String::new(), UNCATEGORIZED_LABEL.to_string()),
        };
        let entry = self.by_key.entry(key.clone()).or_insert_with(|| {
            self.order.push(key);
            CategoryAmount {
                category: label,
                amount: MoneyCents::ZERO,
            }
        });
        entry.amount += amount;
    }

    fn into_sorted(mut self) -> Vec<CategoryAmount> {
        let mut out: Vec<CategoryAmount> = self
            .order
            .iter()
            .filter_map(|key| self.by_key.remove(key))
            .collect();
        out.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        out
    }
}
