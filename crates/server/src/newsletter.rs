//! Newsletter API endpoints

use api_types::newsletter::{
    CampaignError, CampaignMode, CampaignRequest, CampaignResponse, SubscribeRequest,
    SubscribeResponse,
};
use axum::{Extension, Json, extract::State};
use backend::{
    AuthUser, CampaignMessage, Order, OutgoingMail, Query, Recipient, send_campaign as dispatch,
    tables,
};
use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::{
    ServerError,
    auth::{CAMPAIGN_ROLES, require_role},
    server::ServerState,
};

/// Trimmed, lower-cased address when it looks deliverable.
pub(crate) fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    valid.then_some(email)
}

fn text_field(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Handle public subscriptions
pub async fn subscribe(
    State(state): State<ServerState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ServerError> {
    let email = normalize_email(&payload.email)
        .ok_or_else(|| ServerError::Validation("a valid email is required".to_string()))?;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let mut row = Map::new();
    row.insert("email".to_string(), json!(email));
    row.insert("status".to_string(), json!("active"));
    if let Some(name) = name {
        row.insert("name".to_string(), json!(name));
    }

    let subscriber = state
        .persistence
        .upsert(tables::NEWSLETTER_SUBSCRIBERS, Value::Object(row), "email")
        .await?;
    tracing::info!("newsletter subscription for {email}");

    if state.options.welcome_email {
        let greeting = name.map(|name| format!(", {name}")).unwrap_or_default();
        let mail = OutgoingMail {
            to: email.clone(),
            subject: "Inscrição confirmada".to_string(),
            html: format!(
                "<p>Olá{greeting}!</p><p>Obrigado por assinar a nossa newsletter.</p>"
            ),
            ..OutgoingMail::default()
        };
        if let Err(err) = state.mailer.send(&mail).await {
            tracing::warn!("welcome mail to {email} failed: {err}");
        }
    }

    Ok(Json(SubscribeResponse {
        ok: true,
        subscriber,
    }))
}

/// Handle campaign sends, either to a test address or to every active
/// subscriber
pub async fn send_campaign(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<CampaignRequest>,
) -> Result<Json<CampaignResponse>, ServerError> {
    require_role(&user, CAMPAIGN_ROLES)?;

    let subject = payload.subject.trim();
    if subject.is_empty() || payload.html.trim().is_empty() {
        return Err(ServerError::Validation(
            "subject and html are required".to_string(),
        ));
    }
    let test_email = match payload.mode {
        CampaignMode::Test => Some(
            payload
                .test_email
                .as_deref()
                .and_then(normalize_email)
                .ok_or_else(|| {
                    ServerError::Validation("test mode requires a valid test_email".to_string())
                })?,
        ),
        CampaignMode::All => None,
    };

    let campaign = state
        .persistence
        .insert(
            tables::NEWSLETTER_CAMPAIGNS,
            json!({
                "type": payload.kind.as_deref().unwrap_or("newsletter"),
                "subject": subject,
                "html": payload.html,
                "materia_id": payload.materia_id,
                "mode": payload.mode.as_str(),
                "created_by": user.id,
            }),
        )
        .await?;
    let campaign_id = text_field(&campaign, "id").unwrap_or_default();

    let recipients = match test_email {
        Some(email) => vec![Recipient::new(email)],
        None => {
            let rows = state
                .persistence
                .select(
                    Query::table(tables::NEWSLETTER_SUBSCRIBERS)
                        .eq("status", "active")
                        .order("created_at", Order::Asc)
                        .limit(state.options.dispatch.max_recipients),
                )
                .await?;
            rows.iter()
                .filter_map(|row| {
                    Some(Recipient {
                        email: text_field(row, "email")?,
                        name: text_field(row, "name"),
                    })
                })
                .collect()
        }
    };

    let message = CampaignMessage {
        subject: subject.to_string(),
        html: payload.html.clone(),
    };
    let mut cancel = state.shutdown.clone();
    let report = dispatch(
        state.mailer.as_ref(),
        &recipients,
        &message,
        &state.options.dispatch,
        &mut cancel,
    )
    .await;

    if !campaign_id.is_empty() {
        let mut patch = json!({
            "sent_count": report.sent,
            "error_count": report.failed,
        });
        // Test sends leave the campaign unsent.
        if payload.mode == CampaignMode::All {
            patch["sent_at"] = json!(Utc::now().to_rfc3339());
        }
        if let Err(err) = state
            .persistence
            .update(
                Query::table(tables::NEWSLETTER_CAMPAIGNS).eq("id", &campaign_id),
                patch,
            )
            .await
        {
            tracing::error!("failed to mark campaign {campaign_id} as sent: {err}");
        }
    }

    Ok(Json(CampaignResponse {
        ok: true,
        campaign_id,
        sent: report.sent,
        errors: report
            .errors
            .into_iter()
            .map(|err| CampaignError {
                email: err.email,
                error: err.error,
            })
            .collect(),
    }))
}
