//! Projects: scoped initiatives drawing from a fund, or "mixed" when they are
//! backed only by incoming movements tagged to them.

use serde::{Deserialize, Serialize};

use crate::{MoneyCents, Movement, funds::realized_by};

/// Lifecycle of a project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Maps a normalised status token; unknown or missing tokens are
    /// `InProgress`.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("concluido" | "completed" | "done" | "finalizado") => Self::Completed,
            Some("cancelado" | "cancelled" | "canceled") => Self::Cancelled,
            _ => Self::InProgress,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A project with its derived totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// `None` marks a mixed project.
    pub fund_id: Option<String>,
    pub budgeted_total: MoneyCents,
    pub available_balance: MoneyCents,
    pub realized_spend: MoneyCents,
    pub variance: MoneyCents,
    pub execution_percent: f64,
    pub status: ProjectStatus,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, budgeted_total: MoneyCents) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fund_id: None,
            budgeted_total,
            available_balance: budgeted_total,
            realized_spend: MoneyCents::ZERO,
            variance: budgeted_total,
            execution_percent: 0.0,
            status: ProjectStatus::InProgress,
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.fund_id.is_none()
    }

    /// Replaces the derived fields from the given realised totals.
    ///
    /// Fund-backed projects start from their budget; mixed projects start
    /// from zero and only grow through incoming movements tagged to them.
    #[must_use]
    pub fn with_totals(mut self, incoming: MoneyCents, outgoing: MoneyCents) -> Self {
        let base = if self.is_mixed() {
            MoneyCents::ZERO
        } else {
            self.budgeted_total
        };
        self.available_balance = base + incoming - outgoing;
        self.realized_spend = outgoing;
        self.variance = self.budgeted_total - self.realized_spend;
        self.execution_percent = self.realized_spend.percent_of(self.budgeted_total);
        self
    }
}

/// Folds paid movements into each project's totals, keyed by `project_id`.
pub fn aggregate_projects(projects: &[Project], paid_movements: &[Movement]) -> Vec<Project> {
    let totals = realized_by(paid_movements, |m| m.project_id.as_deref());

    projects
        .iter()
        .map(|project| {
            let realized = totals.get(project.id.as_str()).copied().unwrap_or_default();
            project
                .clone()
                .with_totals(realized.incoming, realized.outgoing)
        })
        .collect()
}
