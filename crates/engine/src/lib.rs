//! Financial aggregation for the back-office: row normalisation, fund and
//! project roll-ups, dashboard series and exports.
//!
//! Everything in this crate is a pure function over rows that were already
//! fetched; no I/O happens here.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use serde_json::Value;

pub use dashboard::{
    BudgetItem, BudgetPoint, CashFlowPoint, CategoryAmount, DashboardInput, DashboardSnapshot,
    DateRange, UNCATEGORIZED_LABEL, build_dashboard, planned_total,
};
pub use error::EngineError;
pub use funds::{Fund, FundStatus, aggregate_funds};
pub use money::MoneyCents;
pub use movements::{
    Attachment, Movement, MovementDraft, MovementKind, MovementStatus, attachment_storage_path,
};
pub use periods::{MonthKey, build_periods, build_periods_str};
pub use projects::{Project, ProjectStatus, aggregate_projects};
pub use reports::{FinancialReport, movements_csv};

mod dashboard;
mod dates;
mod error;
mod funds;
mod labels;
mod money;
mod movements;
pub mod normalize;
mod periods;
mod projects;
pub mod reports;
mod row;

pub type ResultEngine<T> = Result<T, EngineError>;

/// Normalised and aggregated view over one fetch of the finance tables.
#[derive(Clone, Debug)]
pub struct Engine {
    today: NaiveDate,
    funds: Vec<Fund>,
    projects: Vec<Project>,
    movements: Vec<Movement>,
    budget_items: Vec<BudgetItem>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Funds with their totals folded from paid movements.
    pub fn funds(&self) -> &[Fund] {
        &self.funds
    }

    /// Projects with their totals folded from paid movements.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn budget_items(&self) -> &[BudgetItem] {
        &self.budget_items
    }

    pub fn find_movement(&self, id: &str) -> Option<&Movement> {
        self.movements.iter().find(|movement| movement.id == id)
    }

    /// Movements dated inside `range`, any status.
    pub fn movements_in(&self, range: DateRange) -> Vec<Movement> {
        self.movements
            .iter()
            .filter(|movement| !movement.date_defaulted && range.contains(movement.date))
            .cloned()
            .collect()
    }

    pub fn planned_total(&self) -> MoneyCents {
        planned_total(&self.funds, &self.projects)
    }

    pub fn dashboard(&self, range: DateRange) -> DashboardSnapshot {
        build_dashboard(DashboardInput {
            funds: &self.funds,
            movements: &self.movements,
            range,
            planned_total: self.planned_total(),
            budget_items: &self.budget_items,
        })
    }

    pub fn report(&self, range: DateRange) -> FinancialReport {
        FinancialReport {
            generated_on: self.today,
            range,
            funds: self.funds.clone(),
            projects: self.projects.clone(),
            dashboard: self.dashboard(range),
            movement_count: self.movements_in(range).len(),
        }
    }

    /// CSV of every movement, or of those inside `range` when given.
    pub fn export_csv(&self, range: Option<DateRange>) -> ResultEngine<Vec<u8>> {
        match range {
            Some(range) => movements_csv(&self.movements_in(range)),
            None => movements_csv(&self.movements),
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    today: Option<NaiveDate>,
    funds: Vec<Value>,
    projects: Vec<Value>,
    movements: Vec<Value>,
    attachments: Vec<Value>,
    budget_items: Vec<Value>,
}

impl EngineBuilder {
    /// Reference day for defaulted dates; the local date when not set.
    pub fn today(mut self, today: NaiveDate) -> EngineBuilder {
        self.today = Some(today);
        self
    }

    pub fn funds(mut self, rows: Vec<Value>) -> EngineBuilder {
        self.funds = rows;
        self
    }

    pub fn projects(mut self, rows: Vec<Value>) -> EngineBuilder {
        self.projects = rows;
        self
    }

    pub fn movements(mut self, rows: Vec<Value>) -> EngineBuilder {
        self.movements = rows;
        self
    }

    /// Attachment rows stored apart from their movement; each is attached
    /// to the movement it references.
    pub fn attachments(mut self, rows: Vec<Value>) -> EngineBuilder {
        self.attachments = rows;
        self
    }

    pub fn budget_items(mut self, rows: Vec<Value>) -> EngineBuilder {
        self.budget_items = rows;
        self
    }

    /// Normalise every row once and fold the aggregates.
    pub fn build(self) -> Engine {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        let mut movements: Vec<Movement> = self
            .movements
            .iter()
            .map(|row| normalize::movement(row, today))
            .collect();
        attach(&mut movements, self.attachments.iter().map(normalize::attachment));
        let funds: Vec<Fund> = self
            .funds
            .iter()
            .map(|row| normalize::fund(row, today))
            .collect();
        let projects: Vec<Project> = self.projects.iter().map(normalize::project).collect();
        let budget_items: Vec<BudgetItem> =
            self.budget_items.iter().map(normalize::budget_item).collect();

        let defaulted = movements.iter().filter(|m| m.date_defaulted).count();
        if defaulted > 0 {
            tracing::warn!("{defaulted} movements have no usable date and are left out of the dashboard");
        }
        tracing::debug!(
            funds = funds.len(),
            projects = projects.len(),
            movements = movements.len(),
            budget_items = budget_items.len(),
            "engine rows normalised"
        );

        Engine {
            today,
            funds: aggregate_funds(&funds, &movements),
            projects: aggregate_projects(&projects, &movements),
            movements,
            budget_items,
        }
    }
}

/// Appends each attachment to its movement, skipping ids already present.
fn attach(movements: &mut [Movement], attachments: impl Iterator<Item = Attachment>) {
    let index: HashMap<String, usize> = movements
        .iter()
        .enumerate()
        .map(|(position, movement)| (movement.id.clone(), position))
        .collect();

    for attachment in attachments {
        let Some(&position) = index.get(&attachment.movement_id) else {
            tracing::debug!("attachment {} has no matching movement", attachment.id);
            continue;
        };
        let movement = &mut movements[position];
        if !movement.attachments.iter().any(|a| a.id == attachment.id) {
            movement.attachments.push(attachment);
        }
    }
}
