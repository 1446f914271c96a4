//! Contact form endpoint

use api_types::contact::{ContactRequest, ContactResponse};
use axum::{Json, extract::State};
use backend::{OutgoingMail, tables};
use serde_json::json;

use crate::{ServerError, newsletter::normalize_email, server::ServerState};

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            other => out.push(other),
        }
    }
    out
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ServerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServerError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Stores a contact message and relays it to the institutional inbox
pub async fn submit(
    State(state): State<ServerState>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, ServerError> {
    let name = required(&payload.name, "name")?;
    let subject = required(&payload.subject, "subject")?;
    let message = required(&payload.message, "message")?;
    let email = normalize_email(required(&payload.email, "email")?)
        .ok_or_else(|| ServerError::Validation("email is not valid".to_string()))?;

    state
        .persistence
        .insert(
            tables::CONTACT_MESSAGES,
            json!({
                "name": name,
                "email": email,
                "subject": subject,
                "message": message,
            }),
        )
        .await?;

    let inbox = state.options.contact_inbox.trim();
    if inbox.is_empty() {
        tracing::warn!("contact inbox not configured, message from {email} stored only");
        return Ok(Json(ContactResponse {
            ok: true,
            relayed: false,
        }));
    }

    let mail = OutgoingMail {
        to: inbox.to_string(),
        subject: format!("[Contato] {subject}"),
        html: format!(
            "<p><strong>{}</strong> &lt;{}&gt; escreveu:</p><p>{}</p>",
            escape_html(name),
            escape_html(&email),
            escape_html(message)
        ),
        reply_to: Some(email.clone()),
        ..OutgoingMail::default()
    };
    let relayed = match state.mailer.send(&mail).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("contact relay for {email} failed: {err}");
            false
        }
    };

    Ok(Json(ContactResponse { ok: true, relayed }))
}
