//! Row normaliser: persisted rows in, typed entities out.
//!
//! Rows come from two schema eras (legacy Portuguese columns and the current
//! English ones). Each field is read through an ordered candidate list from
//! [`keys`]; nothing outside this module knows about the aliases. Normalising
//! never fails: malformed values default as documented on each function.

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::{
    Attachment, Fund, FundStatus, MoneyCents, Movement, MovementKind, MovementStatus, Project,
    ProjectStatus, dashboard::BudgetItem, periods::MonthKey, row::RawRow,
};

/// Candidate keys per field, current key first.
pub(crate) mod keys {
    pub(crate) const ID: &[&str] = &["id"];
    pub(crate) const NAME: &[&str] = &["name", "nome"];
    pub(crate) const YEAR: &[&str] = &["year", "ano"];
    pub(crate) const STATUS: &[&str] = &["status", "situacao"];
    pub(crate) const BUDGETED_TOTAL: &[&str] = &["budgeted_total", "orcamento_total", "valor_orcado"];
    pub(crate) const OPENING_BALANCE: &[&str] = &["opening_balance", "saldo_inicial"];
    pub(crate) const CURRENT_BALANCE: &[&str] = &["current_balance", "saldo_atual"];
    pub(crate) const TOTAL_SPENT: &[&str] = &["total_spent", "total_gasto"];
    pub(crate) const TOTAL_INCOMING: &[&str] = &["total_incoming", "total_entradas"];
    pub(crate) const TOTAL_OUTGOING: &[&str] = &["total_outgoing", "total_saidas"];
    pub(crate) const AVAILABLE_BALANCE: &[&str] = &["available_balance", "saldo_disponivel"];
    pub(crate) const REALIZED_SPEND: &[&str] = &["realized_spend", "valor_realizado"];

    pub(crate) const FUND_ID: &[&str] = &["fund_id", "fundo_id"];
    pub(crate) const PROJECT_ID: &[&str] = &["project_id", "projeto_id"];
    pub(crate) const DATE: &[&str] = &["date", "data", "data_movimentacao"];
    pub(crate) const KIND: &[&str] = &["kind", "type", "tipo"];
    pub(crate) const TITLE: &[&str] = &["title", "titulo"];
    pub(crate) const DESCRIPTION: &[&str] = &["description", "descricao"];
    pub(crate) const UNIT_VALUE: &[&str] = &["unit_value", "valor_unitario"];
    pub(crate) const QUANTITY: &[&str] = &["quantity", "quantidade"];
    pub(crate) const CATEGORY: &[&str] = &["category", "categoria"];
    pub(crate) const PAYMENT_METHOD: &[&str] = &["payment_method", "forma_pagamento"];
    pub(crate) const PAYEE: &[&str] = &["payee", "favorecido"];
    pub(crate) const COST_CENTER: &[&str] = &["cost_center", "centro_custo"];
    pub(crate) const DOCUMENT_TYPE: &[&str] = &["document_type", "tipo_documento"];
    pub(crate) const DOCUMENT_NUMBER: &[&str] = &["document_number", "numero_documento"];
    pub(crate) const NOTES: &[&str] = &["notes", "observacoes"];
    pub(crate) const ATTACHMENTS: &[&str] = &["attachments", "anexos"];

    pub(crate) const ATTACHMENT_MOVEMENT_ID: &[&str] = &["movement_id", "movimentacao_id"];
    pub(crate) const FILE_NAME: &[&str] = &["file_name", "nome_arquivo"];
    pub(crate) const MIME_TYPE: &[&str] = &["mime_type", "tipo_mime"];
    pub(crate) const FILE_SIZE: &[&str] = &["size_bytes", "tamanho"];
    pub(crate) const STORAGE_PATH: &[&str] = &["storage_path", "caminho"];
    pub(crate) const PUBLIC_URL: &[&str] = &["public_url", "url_publica"];

    pub(crate) const MONTH: &[&str] = &["month", "mes", "competencia"];
    pub(crate) const PLANNED_AMOUNT: &[&str] = &["planned_amount", "valor_previsto"];
}

/// Fund row. Missing year defaults to `today`'s year, missing status to
/// `Active`. Derived totals are read back when present so a serialised fund
/// normalises to itself; a fresh row starts with `current_balance` equal to
/// the opening balance.
pub fn fund(row: &Value, today: NaiveDate) -> Fund {
    let row = RawRow::new(row);
    let opening_balance = row.money(keys::OPENING_BALANCE);
    let budgeted_total = row.money(keys::BUDGETED_TOTAL);
    let total_spent = row.money(keys::TOTAL_SPENT);
    let year = i32::try_from(row.integer(keys::YEAR))
        .ok()
        .filter(|year| *year > 0)
        .unwrap_or_else(|| today.year());

    Fund {
        id: row.text_or_empty(keys::ID),
        name: row.text_or_empty(keys::NAME),
        year,
        budgeted_total,
        opening_balance,
        current_balance: row
            .money_opt(keys::CURRENT_BALANCE)
            .unwrap_or(opening_balance),
        total_spent,
        total_incoming: row.money(keys::TOTAL_INCOMING),
        total_outgoing: row.money(keys::TOTAL_OUTGOING),
        status: FundStatus::from_token(row.token(keys::STATUS).as_deref()),
        execution_percent: total_spent.percent_of(budgeted_total),
    }
}

/// Project row. A blank `fund_id` makes the project mixed; missing status is
/// `InProgress`.
pub fn project(row: &Value) -> Project {
    let row = RawRow::new(row);
    let budgeted_total = row.money(keys::BUDGETED_TOTAL);
    let realized_spend = row.money(keys::REALIZED_SPEND);

    Project {
        id: row.text_or_empty(keys::ID),
        name: row.text_or_empty(keys::NAME),
        fund_id: row.text(keys::FUND_ID),
        budgeted_total,
        available_balance: row
            .money_opt(keys::AVAILABLE_BALANCE)
            .unwrap_or(budgeted_total),
        realized_spend,
        variance: budgeted_total - realized_spend,
        execution_percent: realized_spend.percent_of(budgeted_total),
        status: ProjectStatus::from_token(row.token(keys::STATUS).as_deref()),
    }
}

/// Movement row.
///
/// - an unusable date becomes `today` and sets `date_defaulted`;
/// - unknown kind is `Outgoing`, unknown status is `Pending`;
/// - missing unit value or quantity is `0`;
/// - `total_value` is recomputed, never read.
pub fn movement(row: &Value, today: NaiveDate) -> Movement {
    let raw = RawRow::new(row);
    let id = raw.text_or_empty(keys::ID);
    let parsed_date = raw.date(keys::DATE);

    let attachments = raw
        .rows(keys::ATTACHMENTS)
        .iter()
        .map(|nested| {
            let mut attachment = attachment(nested);
            if attachment.movement_id.is_empty() {
                attachment.movement_id.clone_from(&id);
            }
            attachment
        })
        .collect();

    let mut movement = Movement {
        id,
        date: parsed_date.unwrap_or(today),
        date_defaulted: parsed_date.is_none(),
        kind: MovementKind::from_token(raw.token(keys::KIND).as_deref()),
        fund_id: raw.text(keys::FUND_ID),
        project_id: raw.text(keys::PROJECT_ID),
        title: raw.text_or_empty(keys::TITLE),
        description: raw.text_or_empty(keys::DESCRIPTION),
        unit_value: raw.money(keys::UNIT_VALUE),
        quantity: raw.number(keys::QUANTITY),
        total_value: MoneyCents::ZERO,
        status: MovementStatus::from_token(raw.token(keys::STATUS).as_deref()),
        status_recorded: raw.has(keys::STATUS),
        category: raw.text_or_empty(keys::CATEGORY),
        payment_method: raw.text_or_empty(keys::PAYMENT_METHOD),
        payee: raw.text_or_empty(keys::PAYEE),
        cost_center: raw.text_or_empty(keys::COST_CENTER),
        document_type: raw.text_or_empty(keys::DOCUMENT_TYPE),
        document_number: raw.text_or_empty(keys::DOCUMENT_NUMBER),
        notes: raw.text_or_empty(keys::NOTES),
        attachments,
    };
    movement.recompute_total();
    movement
}

/// Attachment row; negative or malformed sizes are `0`.
pub fn attachment(row: &Value) -> Attachment {
    let row = RawRow::new(row);
    Attachment {
        id: row.text_or_empty(keys::ID),
        movement_id: row.text_or_empty(keys::ATTACHMENT_MOVEMENT_ID),
        file_name: row.text_or_empty(keys::FILE_NAME),
        mime_type: row.text_or_empty(keys::MIME_TYPE),
        size_bytes: u64::try_from(row.integer(keys::FILE_SIZE)).unwrap_or(0),
        storage_path: row.text_or_empty(keys::STORAGE_PATH),
        public_url: row.text(keys::PUBLIC_URL),
    }
}

/// Budget item row. The month accepts `YYYY-MM` or any supported date.
pub fn budget_item(row: &Value) -> BudgetItem {
    let row = RawRow::new(row);
    BudgetItem {
        id: row.text_or_empty(keys::ID),
        fund_id: row.text(keys::FUND_ID),
        project_id: row.text(keys::PROJECT_ID),
        month: row
            .text(keys::MONTH)
            .and_then(|month| month.parse::<MonthKey>().ok()),
        planned_amount: row.money(keys::PLANNED_AMOUNT),
    }
}
