//! Exports: movement CSV and the consolidated financial report.

use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;

use crate::{
    DashboardSnapshot, DateRange, EngineError, Fund, MoneyCents, Movement, Project, ResultEngine,
};

#[derive(Serialize)]
struct MovementCsvRow<'a> {
    id: &'a str,
    date: String,
    kind: &'static str,
    status: &'static str,
    title: &'a str,
    fund_id: &'a str,
    project_id: &'a str,
    category: &'a str,
    payee: &'a str,
    payment_method: &'a str,
    cost_center: &'a str,
    document_type: &'a str,
    document_number: &'a str,
    unit_value: MoneyCents,
    quantity: f64,
    total_value: MoneyCents,
    attachments: usize,
}

/// Movements as CSV with a header row, in the given order.
pub fn movements_csv(movements: &[Movement]) -> ResultEngine<Vec<u8>> {
    let mut writer = Writer::from_writer(vec![]);
    for movement in movements {
        writer.serialize(MovementCsvRow {
            id: &movement.id,
            date: movement.date.to_string(),
            kind: movement.kind.as_str(),
            status: movement.status.as_str(),
            title: &movement.title,
            fund_id: movement.fund_id.as_deref().unwrap_or_default(),
            project_id: movement.project_id.as_deref().unwrap_or_default(),
            category: &movement.category,
            payee: &movement.payee,
            payment_method: &movement.payment_method,
            cost_center: &movement.cost_center,
            document_type: &movement.document_type,
            document_number: &movement.document_number,
            unit_value: movement.unit_value,
            quantity: movement.quantity,
            total_value: movement.total_value,
            attachments: movement.attachments.len(),
        })?;
    }
    writer
        .into_inner()
        .map_err(|err| EngineError::Report(err.into_error().into()))
}

/// Point-in-time financial report over a range.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinancialReport {
    pub generated_on: NaiveDate,
    pub range: DateRange,
    pub funds: Vec<Fund>,
    pub projects: Vec<Project>,
    pub dashboard: DashboardSnapshot,
    /// Movements dated inside the range, any status.
    pub movement_count: usize,
}
