//! Finance API endpoints
//!
//! Every request fetches the finance tables and rebuilds an [`Engine`]; the
//! aggregates are never stored.

use api_types::finance::{MovementDeleted, RangeQuery};
use axum::{
    Json,
    extract::{Path, Query as QueryParams, State},
    http::header,
    response::IntoResponse,
};
use backend::{Query, ResultBackend, tables};
use chrono::{Local, NaiveDate};
use engine::{
    Attachment, DashboardSnapshot, DateRange, Engine, FinancialReport, Fund, Movement,
    MovementDraft, Project, normalize,
};
use serde_json::Value;

use crate::{ServerError, server::ServerState};

/// Rows of one table. Lenient loads log the failure and carry on with no
/// rows, so the dashboard degrades to zeros instead of failing.
fn rows_or_empty(
    result: ResultBackend<Vec<Value>>,
    table: &str,
    lenient: bool,
) -> Result<Vec<Value>, ServerError> {
    match result {
        Ok(rows) => Ok(rows),
        Err(err) if lenient => {
            tracing::warn!("loading {table} failed, using no rows: {err}");
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}

async fn load_engine(
    state: &ServerState,
    today: NaiveDate,
    lenient: bool,
) -> Result<Engine, ServerError> {
    let persistence = state.persistence.as_ref();
    let (funds, projects, movements, attachments, budget_items) = tokio::join!(
        persistence.select(Query::table(tables::FUNDS)),
        persistence.select(Query::table(tables::PROJECTS)),
        persistence.select(Query::table(tables::MOVEMENTS)),
        persistence.select(Query::table(tables::MOVEMENT_ATTACHMENTS)),
        persistence.select(Query::table(tables::BUDGET_ITEMS)),
    );

    Ok(Engine::builder()
        .today(today)
        .funds(rows_or_empty(funds, tables::FUNDS, lenient)?)
        .projects(rows_or_empty(projects, tables::PROJECTS, lenient)?)
        .movements(rows_or_empty(movements, tables::MOVEMENTS, lenient)?)
        // Optional tables: an older schema may not have them.
        .attachments(rows_or_empty(
            attachments,
            tables::MOVEMENT_ATTACHMENTS,
            true,
        )?)
        .budget_items(rows_or_empty(budget_items, tables::BUDGET_ITEMS, true)?)
        .build())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn resolve_range(query: &RangeQuery, today: NaiveDate) -> Result<DateRange, ServerError> {
    DateRange::resolve(query.start.as_deref(), query.end.as_deref(), today)
        .map_err(|err| ServerError::Validation(err.to_string()))
}

pub async fn funds(State(state): State<ServerState>) -> Result<Json<Vec<Fund>>, ServerError> {
    let engine = load_engine(&state, today(), false).await?;
    Ok(Json(engine.funds().to_vec()))
}

pub async fn projects(
    State(state): State<ServerState>,
) -> Result<Json<Vec<Project>>, ServerError> {
    let engine = load_engine(&state, today(), false).await?;
    Ok(Json(engine.projects().to_vec()))
}

pub async fn dashboard(
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<RangeQuery>,
) -> Result<Json<DashboardSnapshot>, ServerError> {
    let today = today();
    let range = resolve_range(&query, today)?;
    let engine = load_engine(&state, today, true).await?;
    Ok(Json(engine.dashboard(range)))
}

pub async fn report(
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<RangeQuery>,
) -> Result<Json<FinancialReport>, ServerError> {
    let today = today();
    let range = resolve_range(&query, today)?;
    let engine = load_engine(&state, today, false).await?;
    Ok(Json(engine.report(range)))
}

/// CSV export; without bounds every movement is exported.
pub async fn export_movements(
    State(state): State<ServerState>,
    QueryParams(query): QueryParams<RangeQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let today = today();
    let range = if query.start.is_none() && query.end.is_none() {
        None
    } else {
        Some(resolve_range(&query, today)?)
    };
    let engine = load_engine(&state, today, false).await?;
    let csv = engine.export_csv(range)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"movements.csv\"",
            ),
        ],
        csv,
    ))
}

/// Creates or updates a movement. The stored total is always recomputed.
pub async fn save_movement(
    State(state): State<ServerState>,
    Json(draft): Json<MovementDraft>,
) -> Result<Json<Movement>, ServerError> {
    let movement = draft.prepare()?;
    let stored = state
        .persistence
        .upsert(tables::MOVEMENTS, movement.to_write_row(), "id")
        .await?;
    let saved = normalize::movement(&stored, today());
    tracing::info!("movement {} saved ({})", saved.id, saved.total_value);
    Ok(Json(saved))
}

/// Deletes a movement after its attachments: storage objects first, then
/// attachment rows, then the movement row.
///
/// Attachments are resolved like the engine joins them, so rows keyed by the
/// legacy column and files nested in the movement row are removed too.
pub async fn delete_movement(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MovementDeleted>, ServerError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ServerError::Validation("movement id is required".to_string()));
    }

    let persistence = state.persistence.as_ref();
    let (movement_rows, current_rows, legacy_rows) = tokio::join!(
        persistence.select(Query::table(tables::MOVEMENTS).eq("id", &id)),
        persistence.select(Query::table(tables::MOVEMENT_ATTACHMENTS).eq("movement_id", &id)),
        persistence.select(Query::table(tables::MOVEMENT_ATTACHMENTS).eq("movimentacao_id", &id)),
    );
    let mut attachment_rows = rows_or_empty(current_rows, tables::MOVEMENT_ATTACHMENTS, true)?;
    attachment_rows.extend(rows_or_empty(
        legacy_rows,
        tables::MOVEMENT_ATTACHMENTS,
        true,
    )?);

    let mut stored: Vec<Attachment> = Vec::new();
    for attachment in attachment_rows.iter().map(normalize::attachment) {
        if attachment.id.is_empty() || !stored.iter().any(|known| known.id == attachment.id) {
            stored.push(attachment);
        }
    }
    let engine = Engine::builder()
        .today(today())
        .movements(movement_rows?)
        .attachments(attachment_rows)
        .build();
    let attachments = match engine.find_movement(&id) {
        Some(movement) => movement.attachments.clone(),
        None => stored.clone(),
    };

    let paths: Vec<String> = attachments
        .iter()
        .map(|attachment| attachment.storage_path.clone())
        .filter(|path| !path.is_empty())
        .collect();
    persistence.remove_objects(&paths).await?;

    let row_ids = stored
        .iter()
        .map(|attachment| attachment.id.as_str())
        .filter(|row_id| !row_id.is_empty());
    for row_id in row_ids {
        persistence
            .delete(Query::table(tables::MOVEMENT_ATTACHMENTS).eq("id", row_id))
            .await?;
    }
    persistence
        .delete(Query::table(tables::MOVEMENTS).eq("id", &id))
        .await?;
    tracing::info!("movement {id} deleted with {} attachments", attachments.len());

    Ok(Json(MovementDeleted {
        ok: true,
        id,
        attachments_removed: attachments.len(),
    }))
}
