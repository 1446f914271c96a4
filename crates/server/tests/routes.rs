use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use backend::{
    AuthUser, BackendError, DispatchSettings, MailError, Mailer, OutgoingMail, Persistence, Query,
    ResultBackend, Role,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{ServerOptions, ServerState, router};
use tokio::sync::watch;
use tower::ServiceExt;

/// In-memory row store understanding `eq` filters and `limit`.
#[derive(Default)]
struct FakePersistence {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    users: HashMap<String, AuthUser>,
    failing_tables: Vec<&'static str>,
    removed_objects: Mutex<Vec<String>>,
    next_id: Mutex<u32>,
}

impl FakePersistence {
    fn with_user(mut self, token: &str, role: Role) -> Self {
        self.users.insert(
            token.to_string(),
            AuthUser {
                id: format!("user-{token}"),
                email: Some(format!("{token}@jornal.test")),
                role,
            },
        );
        self
    }

    fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    fn failing(mut self, table: &'static str) -> Self {
        self.failing_tables.push(table);
        self
    }

    fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, table: &str) -> ResultBackend<()> {
        if self.failing_tables.contains(&table) {
            return Err(BackendError::Status {
                status: 503,
                message: format!("{table} unavailable"),
            });
        }
        Ok(())
    }

    fn fresh_id(&self, table: &str) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("{table}-{next}")
    }
}

fn cell(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn matches(row: &Value, query: &Query) -> bool {
    query.params().iter().all(|(column, condition)| {
        match condition.strip_prefix("eq.") {
            Some(expected) if column != "order" && column != "limit" => {
                cell(row, column).as_deref() == Some(expected)
            }
            _ => true,
        }
    })
}

fn limit_of(query: &Query) -> Option<usize> {
    query
        .params()
        .iter()
        .find(|(key, _)| key == "limit")
        .and_then(|(_, value)| value.parse().ok())
}

#[async_trait]
impl Persistence for FakePersistence {
    async fn select(&self, query: Query) -> ResultBackend<Vec<Value>> {
        self.check(query.table_name())?;
        let rows: Vec<Value> = self
            .rows(query.table_name())
            .into_iter()
            .filter(|row| matches(row, &query))
            .collect();
        Ok(match limit_of(&query) {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        })
    }

    async fn insert(&self, table: &str, mut row: Value) -> ResultBackend<Value> {
        self.check(table)?;
        if row.get("id").is_none() {
            row["id"] = json!(self.fresh_id(table));
        }
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, mut row: Value, on_conflict: &str) -> ResultBackend<Value> {
        self.check(table)?;
        let key = cell(&row, on_conflict);
        if row.get("id").is_none() {
            row["id"] = json!(self.fresh_id(table));
        }
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let existing = key.and_then(|key| {
            rows.iter()
                .position(|existing| cell(existing, on_conflict).as_deref() == Some(key.as_str()))
        });
        match existing {
            Some(index) => {
                if let (Some(target), Some(patch)) = (rows[index].as_object_mut(), row.as_object())
                {
                    for (column, value) in patch {
                        if column != "id" {
                            target.insert(column.clone(), value.clone());
                        }
                    }
                }
                Ok(rows[index].clone())
            }
            None => {
                rows.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn update(&self, query: Query, patch: Value) -> ResultBackend<Vec<Value>> {
        self.check(query.table_name())?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(query.table_name().to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches(row, &query)) {
            if let (Some(target), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
                for (column, value) in patch {
                    target.insert(column.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, query: Query) -> ResultBackend<()> {
        self.check(query.table_name())?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(query.table_name()) {
            rows.retain(|row| !matches(row, &query));
        }
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> ResultBackend<Option<AuthUser>> {
        Ok(self.users.get(token).cloned())
    }

    async fn remove_objects(&self, paths: &[String]) -> ResultBackend<()> {
        self.removed_objects
            .lock()
            .unwrap()
            .extend(paths.iter().cloned());
        Ok(())
    }
}

#[derive(Default)]
struct FakeMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    reject: Vec<&'static str>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.reject.contains(&mail.to.as_str()) {
            return Err(MailError::Rejected {
                status: 422,
                message: "mailbox unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

struct Harness {
    app: Router,
    persistence: Arc<FakePersistence>,
    mailer: Arc<FakeMailer>,
    _shutdown: watch::Sender<bool>,
}

fn harness(persistence: FakePersistence, mailer: FakeMailer) -> Harness {
    let persistence = Arc::new(persistence);
    let mailer = Arc::new(mailer);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let options = ServerOptions {
        dispatch: DispatchSettings {
            delay: Duration::ZERO,
            max_recipients: 10,
        },
        welcome_email: true,
        contact_inbox: "redacao@jornal.test".to_string(),
    };
    let state = ServerState::new(persistence.clone(), mailer.clone(), options, shutdown_rx);
    Harness {
        app: router(state),
        persistence,
        mailer,
        _shutdown: shutdown_tx,
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>, Option<String>) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec(), content_type)
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn subscribe_upserts_by_normalised_email() {
    let h = harness(FakePersistence::default(), FakeMailer::default());

    let body = json!({"email": "  Leitora@Example.org ", "name": "Ana"});
    let (status, bytes, _) =
        call(&h.app, Method::POST, "/newsletter-subscribe", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let response = json_body(&bytes);
    assert_eq!(response["ok"], true);
    assert_eq!(response["subscriber"]["email"], "leitora@example.org");
    assert_eq!(response["subscriber"]["status"], "active");

    call(&h.app, Method::POST, "/newsletter-subscribe", None, Some(body)).await;
    assert_eq!(h.persistence.rows("newsletter_subscribers").len(), 1);

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "leitora@example.org");
    assert!(sent[0].html.contains("Ana"));
}

#[tokio::test]
async fn subscribe_rejects_invalid_email() {
    let h = harness(FakePersistence::default(), FakeMailer::default());

    let (status, bytes, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-subscribe",
        None,
        Some(json!({"email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&bytes)["error"].is_string());
    assert!(h.persistence.rows("newsletter_subscribers").is_empty());
}

#[tokio::test]
async fn welcome_mail_failure_does_not_fail_subscription() {
    let h = harness(
        FakePersistence::default(),
        FakeMailer {
            reject: vec!["leitor@example.org"],
            ..FakeMailer::default()
        },
    );

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-subscribe",
        None,
        Some(json!({"email": "leitor@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.persistence.rows("newsletter_subscribers").len(), 1);
}

#[tokio::test]
async fn contact_is_stored_and_relayed() {
    let h = harness(FakePersistence::default(), FakeMailer::default());

    let (status, bytes, _) = call(
        &h.app,
        Method::POST,
        "/contact-submit",
        None,
        Some(json!({
            "name": "João",
            "email": "joao@example.org",
            "subject": "Pauta",
            "message": "Sugestão <b>importante</b>"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes), json!({"ok": true, "relayed": true}));
    assert_eq!(h.persistence.rows("contact_messages").len(), 1);

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent[0].to, "redacao@jornal.test");
    assert_eq!(sent[0].reply_to.as_deref(), Some("joao@example.org"));
    assert!(sent[0].html.contains("&lt;b&gt;importante&lt;/b&gt;"));
}

#[tokio::test]
async fn contact_requires_every_field() {
    let h = harness(FakePersistence::default(), FakeMailer::default());

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/contact-submit",
        None,
        Some(json!({"name": "João", "email": "joao@example.org", "subject": "Pauta"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.persistence.rows("contact_messages").is_empty());
}

#[tokio::test]
async fn contact_relay_failure_is_reported() {
    let h = harness(
        FakePersistence::default(),
        FakeMailer {
            reject: vec!["redacao@jornal.test"],
            ..FakeMailer::default()
        },
    );

    let (status, bytes, _) = call(
        &h.app,
        Method::POST,
        "/contact-submit",
        None,
        Some(json!({"name": "A", "email": "a@example.org", "subject": "S", "message": "M"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes)["relayed"], false);
    assert_eq!(h.persistence.rows("contact_messages").len(), 1);
}

fn campaign(mode: &str) -> Value {
    json!({
        "type": "weekly",
        "subject": "Edição da semana",
        "html": "<p>Olá {{name}}</p>",
        "mode": mode,
        "test_email": "teste@jornal.test"
    })
}

#[tokio::test]
async fn campaign_requires_token_and_role() {
    let h = harness(
        FakePersistence::default()
            .with_user("reader", Role::Reader)
            .with_user("finance", Role::Finance),
        FakeMailer::default(),
    );

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-send-campaign",
        None,
        Some(campaign("test")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-send-campaign",
        Some("unknown"),
        Some(campaign("test")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for token in ["reader", "finance"] {
        let (status, bytes, _) = call(
            &h.app,
            Method::POST,
            "/newsletter-send-campaign",
            Some(token),
            Some(campaign("test")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json_body(&bytes)["error"], "forbidden");
    }
    assert!(h.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_campaign_goes_to_test_address_only() {
    let h = harness(
        FakePersistence::default()
            .with_user("editor", Role::Editor)
            .with_rows(
                "newsletter_subscribers",
                vec![json!({"id": "s1", "email": "a@example.org", "status": "active"})],
            ),
        FakeMailer::default(),
    );

    let (status, bytes, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-send-campaign",
        Some("editor"),
        Some(campaign("test")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response = json_body(&bytes);
    assert_eq!(response["sent"], 1);

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "teste@jornal.test");

    let campaigns = h.persistence.rows("newsletter_campaigns");
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0]["id"], response["campaign_id"]);
    assert_eq!(campaigns[0]["sent_count"], 1);
    assert!(campaigns[0].get("sent_at").is_none());
}

#[tokio::test]
async fn campaign_to_all_active_subscribers() {
    let h = harness(
        FakePersistence::default()
            .with_user("chefe", Role::AdminAlfa)
            .with_rows(
                "newsletter_subscribers",
                vec![
                    json!({"id": "s1", "email": "a@example.org", "name": "Ana", "status": "active"}),
                    json!({"id": "s2", "email": "b@example.org", "status": "unsubscribed"}),
                    json!({"id": "s3", "email": "c@example.org", "status": "active"}),
                ],
            ),
        FakeMailer {
            reject: vec!["c@example.org"],
            ..FakeMailer::default()
        },
    );

    let (status, bytes, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-send-campaign",
        Some("chefe"),
        Some(campaign("all")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response = json_body(&bytes);
    assert_eq!(response["sent"], 1);
    assert_eq!(response["errors"][0]["email"], "c@example.org");

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].html, "<p>Olá Ana</p>");

    let campaigns = h.persistence.rows("newsletter_campaigns");
    assert_eq!(campaigns[0]["error_count"], 1);
    assert!(campaigns[0]["sent_at"].is_string());
}

#[tokio::test]
async fn campaign_validation() {
    let h = harness(
        FakePersistence::default().with_user("admin", Role::Admin),
        FakeMailer::default(),
    );

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-send-campaign",
        Some("admin"),
        Some(json!({"subject": "", "html": "<p>x</p>", "mode": "all"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/newsletter-send-campaign",
        Some("admin"),
        Some(json!({"subject": "S", "html": "<p>x</p>", "mode": "test"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.persistence.rows("newsletter_campaigns").is_empty());
}

fn finance_store() -> FakePersistence {
    FakePersistence::default()
        .with_user("fin", Role::Finance)
        .with_user("editor", Role::Editor)
        .with_rows(
            "funds",
            vec![json!({
                "id": "f1", "nome": "Fundo Geral", "ano": 2020,
                "orcamento_total": 1000, "saldo_inicial": 500
            })],
        )
        .with_rows(
            "movements",
            vec![
                json!({
                    "id": "m1", "data": "2020-02-10", "tipo": "saida", "fundo_id": "f1",
                    "titulo": "Impressão", "valor_unitario": 5, "quantidade": 1, "status": "pago"
                }),
                json!({
                    "id": "m2", "date": "2020-03-01", "kind": "entrada", "fund_id": "f1",
                    "title": "Doação", "unit_value": 20, "quantity": 1, "status": "pago"
                }),
            ],
        )
        .with_rows(
            "movement_attachments",
            vec![
                json!({"id": "a1", "movement_id": "m1", "file_name": "nf.pdf", "storage_path": "movements/m1/x-nf.pdf"}),
                json!({"id": "a2", "movement_id": "m2", "file_name": "r.pdf", "storage_path": "movements/m2/y-r.pdf"}),
            ],
        )
}

#[tokio::test]
async fn finance_routes_require_finance_role() {
    let h = harness(finance_store(), FakeMailer::default());

    let (status, _, _) = call(&h.app, Method::GET, "/finance/funds", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = call(&h.app, Method::GET, "/finance/funds", Some("editor"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, bytes, _) = call(&h.app, Method::GET, "/finance/funds", Some("fin"), None).await;
    assert_eq!(status, StatusCode::OK);
    let funds = json_body(&bytes);
    assert_eq!(funds[0]["name"], "Fundo Geral");
    assert_eq!(funds[0]["current_balance"], json!(515.0));
    assert_eq!(funds[0]["total_spent"], json!(5.0));
}

#[tokio::test]
async fn dashboard_uses_range_and_degrades_to_zero() {
    let h = harness(finance_store(), FakeMailer::default());

    let (status, bytes, _) = call(
        &h.app,
        Method::GET,
        "/finance/dashboard?start=2020-01-01&end=2020-03-31",
        Some("fin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = json_body(&bytes);
    assert_eq!(snapshot["incoming_total"], json!(20.0));
    assert_eq!(snapshot["outgoing_total"], json!(5.0));
    assert_eq!(snapshot["cash_flow_series"][1]["period"], "2020-02");
    assert_eq!(snapshot["cash_flow_series"].as_array().unwrap().len(), 3);

    let (status, _, _) = call(
        &h.app,
        Method::GET,
        "/finance/dashboard?start=ontem",
        Some("fin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let broken = harness(finance_store().failing("movements"), FakeMailer::default());
    let (status, bytes, _) = call(
        &broken.app,
        Method::GET,
        "/finance/dashboard?start=2020-01-01&end=2020-03-31",
        Some("fin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes)["incoming_total"], json!(0.0));

    let (status, bytes, _) =
        call(&broken.app, Method::GET, "/finance/funds", Some("fin"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&bytes)["error"], "internal server error");
}

#[tokio::test]
async fn saving_a_movement_recomputes_total() {
    let h = harness(finance_store(), FakeMailer::default());

    let (status, bytes, _) = call(
        &h.app,
        Method::POST,
        "/finance/movements",
        Some("fin"),
        Some(json!({
            "date": "2020-04-02",
            "kind": "saida",
            "fund_id": "f1",
            "title": "Diárias",
            "unit_value": 500,
            "quantity": 2,
            "total_value": 3,
            "status": "pago"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let saved = json_body(&bytes);
    assert_eq!(saved["total_value"], json!(1000.0));
    assert!(saved["id"].is_string());

    let stored = h.persistence.rows("movements");
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[2]["total_value"], json!(1000.0));

    let (status, _, _) = call(
        &h.app,
        Method::POST,
        "/finance/movements",
        Some("fin"),
        Some(json!({
            "date": "2020-04-02", "kind": "saida", "title": "Sem destino",
            "unit_value": 1, "quantity": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn deleting_a_movement_cascades() {
    let h = harness(finance_store(), FakeMailer::default());

    let (status, bytes, _) =
        call(&h.app, Method::DELETE, "/finance/movements/m1", Some("fin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes)["attachments_removed"], 1);

    assert_eq!(
        *h.persistence.removed_objects.lock().unwrap(),
        vec!["movements/m1/x-nf.pdf".to_string()]
    );
    let attachments = h.persistence.rows("movement_attachments");
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["id"], "a2");
    let movements = h.persistence.rows("movements");
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["id"], "m2");
}

#[tokio::test]
async fn deleting_a_movement_removes_legacy_and_nested_attachments() {
    let store = finance_store()
        .with_rows(
            "movements",
            vec![json!({
                "id": "m3", "data": "2020-03-05", "tipo": "saida", "fundo_id": "f1",
                "titulo": "Fotos", "valor_unitario": 2, "quantidade": 1,
                "anexos": [{"id": "n1", "nome_arquivo": "foto.jpg", "caminho": "movements/m3/n-foto.jpg"}]
            })],
        )
        .with_rows(
            "movement_attachments",
            vec![
                json!({"id": "a3", "movimentacao_id": "m3", "nome_arquivo": "nf.pdf", "caminho": "movements/m3/z-nf.pdf"}),
                json!({"id": "a4", "movement_id": "m3", "file_name": "r.pdf", "storage_path": "movements/m3/w-r.pdf"}),
                json!({"id": "a5", "movement_id": "m9", "file_name": "x.pdf", "storage_path": "movements/m9/x.pdf"}),
            ],
        );
    let h = harness(store, FakeMailer::default());

    let (status, bytes, _) =
        call(&h.app, Method::DELETE, "/finance/movements/m3", Some("fin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes)["attachments_removed"], 3);

    let mut removed = h.persistence.removed_objects.lock().unwrap().clone();
    removed.sort();
    assert_eq!(
        removed,
        vec![
            "movements/m3/n-foto.jpg".to_string(),
            "movements/m3/w-r.pdf".to_string(),
            "movements/m3/z-nf.pdf".to_string(),
        ]
    );
    let attachments = h.persistence.rows("movement_attachments");
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["id"], "a5");
    assert!(h.persistence.rows("movements").is_empty());
}

#[tokio::test]
async fn export_is_csv() {
    let h = harness(finance_store(), FakeMailer::default());

    let (status, bytes, content_type) = call(
        &h.app,
        Method::GET,
        "/finance/movements/export?start=2020-02-01&end=2020-02-29",
        Some("fin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
    let csv = String::from_utf8(bytes).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.lines().nth(1).unwrap().starts_with("m1,2020-02-10,outgoing,paid"));
}

#[tokio::test]
async fn report_covers_range() {
    let h = harness(finance_store(), FakeMailer::default());

    let (status, bytes, _) = call(
        &h.app,
        Method::GET,
        "/finance/report?start=2020-03-01&end=2020-03-31",
        Some("fin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report = json_body(&bytes);
    assert_eq!(report["movement_count"], 1);
    assert_eq!(report["range"]["start"], "2020-03-01");
    assert_eq!(report["funds"][0]["id"], "f1");
}
