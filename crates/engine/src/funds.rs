//! Funds: yearly money pools and their roll-up from paid movements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{MoneyCents, Movement, MovementKind};

/// Lifecycle of a fund.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    #[default]
    Active,
    Completed,
}

impl FundStatus {
    /// Maps a normalised status token; unknown or missing tokens are `Active`.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("encerrado" | "concluido" | "completed" | "done" | "closed" | "finalizado") => {
                Self::Completed
            }
            _ => Self::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// A fund with its derived totals.
///
/// Invariants after [`aggregate_funds`]:
/// - `current_balance == opening_balance + total_incoming - total_outgoing`
/// - `total_spent == total_outgoing`
/// - `execution_percent` is `total_spent / budgeted_total` as a percentage,
///   clamped to `[0, 100]`, and `0` when nothing is budgeted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Fund {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub budgeted_total: MoneyCents,
    pub opening_balance: MoneyCents,
    pub current_balance: MoneyCents,
    pub total_spent: MoneyCents,
    pub total_incoming: MoneyCents,
    pub total_outgoing: MoneyCents,
    pub status: FundStatus,
    pub execution_percent: f64,
}

impl Fund {
    /// A fund with no movements folded in yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>, budgeted_total: MoneyCents) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            year: 0,
            budgeted_total,
            opening_balance: MoneyCents::ZERO,
            current_balance: MoneyCents::ZERO,
            total_spent: MoneyCents::ZERO,
            total_incoming: MoneyCents::ZERO,
            total_outgoing: MoneyCents::ZERO,
            status: FundStatus::Active,
            execution_percent: 0.0,
        }
    }

    /// Replaces the derived fields from the given realised totals.
    #[must_use]
    pub fn with_totals(mut self, incoming: MoneyCents, outgoing: MoneyCents) -> Self {
        self.total_incoming = incoming;
        self.total_outgoing = outgoing;
        self.total_spent = outgoing;
        self.current_balance = self.opening_balance + incoming - outgoing;
        self.execution_percent = self.total_spent.percent_of(self.budgeted_total);
        self
    }
}

/// Paid incoming/outgoing sums per key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Realized {
    pub(crate) incoming: MoneyCents,
    pub(crate) outgoing: MoneyCents,
}

impl Realized {
    pub(crate) fn record(&mut self, movement: &Movement) {
        match movement.kind {
            MovementKind::Incoming => self.incoming += movement.total_value,
            MovementKind::Outgoing => self.outgoing += movement.total_value,
        }
    }
}

/// Sums paid movements per key; non-paid movements and movements without a
/// key are skipped.
pub(crate) fn realized_by<'m>(
    movements: &'m [Movement],
    key: impl Fn(&'m Movement) -> Option<&'m str>,
) -> HashMap<&'m str, Realized> {
    let mut totals: HashMap<&str, Realized> = HashMap::new();
    for movement in movements.iter().filter(|m| m.is_paid()) {
        if let Some(id) = key(movement) {
            totals.entry(id).or_default().record(movement);
        }
    }
    totals
}

/// Folds paid movements into each fund's totals.
///
/// Movements without a `fund_id` belong to mixed projects and are ignored
/// here. A fund with no matching movements keeps its opening balance and an
/// execution of `0`.
pub fn aggregate_funds(funds: &[Fund], paid_movements: &[Movement]) -> Vec<Fund> {
    let totals = realized_by(paid_movements, |m| m.fund_id.as_deref());

    funds
        .iter()
        .map(|fund| {
            let realized = totals.get(fund.id.as_str()).copied().unwrap_or_default();
            fund.clone().with_totals(realized.incoming, realized.outgoing)
        })
        .collect()
}
