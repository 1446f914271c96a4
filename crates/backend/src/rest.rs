use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AuthUser, BackendError, Persistence, Query, ResultBackend, Role, tables};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "msg", alias = "error_description")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// [`Persistence`] backed by the hosted platform's REST, auth and storage
/// endpoints, authenticated with the service key.
#[derive(Clone, Debug)]
pub struct RestPersistence {
    http: Client,
    base_url: String,
    service_key: String,
    storage_bucket: String,
}

impl RestPersistence {
    pub fn new(base_url: &str, service_key: &str, storage_bucket: &str) -> ResultBackend<Self> {
        Self::with_client(Client::new(), base_url, service_key, storage_bucket)
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        service_key: &str,
        storage_bucket: &str,
    ) -> ResultBackend<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BackendError::Config(format!(
                "platform url must be http(s): {base_url:?}"
            )));
        }
        if service_key.trim().is_empty() {
            return Err(BackendError::Config(
                "platform service key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            service_key: service_key.trim().to_string(),
            storage_bucket: storage_bucket.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn table_url(&self, table: &str) -> String {
        self.url(&format!("rest/v1/{table}"))
    }

    fn with_service_key(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send_rows(&self, request: RequestBuilder) -> ResultBackend<Vec<Value>> {
        let response = check(self.with_service_key(request).send().await?).await?;
        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(BackendError::Decode(format!("expected rows, got {other}"))),
        }
    }

    async fn role_of(&self, user_id: &str) -> ResultBackend<Role> {
        let rows = self
            .select(Query::table(tables::PROFILES).eq("id", user_id).limit(1))
            .await?;
        let role = rows
            .first()
            .and_then(|row| row.get("role"))
            .and_then(Value::as_str);
        Ok(Role::from_token(role))
    }
}

/// Turns non-success responses into [`BackendError::Status`].
async fn check(response: Response) -> ResultBackend<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.message)
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

fn first_row(rows: Vec<Value>, table: &str) -> ResultBackend<Value> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::Decode(format!("{table}: write returned no row")))
}

#[async_trait]
impl Persistence for RestPersistence {
    async fn select(&self, query: Query) -> ResultBackend<Vec<Value>> {
        let request = self
            .http
            .get(self.table_url(query.table_name()))
            .query(&query.params());
        self.send_rows(request).await
    }

    async fn insert(&self, table: &str, row: Value) -> ResultBackend<Value> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row);
        first_row(self.send_rows(request).await?, table)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> ResultBackend<Value> {
        let request = self
            .http
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&row);
        first_row(self.send_rows(request).await?, table)
    }

    async fn update(&self, query: Query, patch: Value) -> ResultBackend<Vec<Value>> {
        let request = self
            .http
            .patch(self.table_url(query.table_name()))
            .query(&query.params())
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);
        self.send_rows(request).await
    }

    async fn delete(&self, query: Query) -> ResultBackend<()> {
        if query.is_unfiltered() {
            return Err(BackendError::Config(format!(
                "refusing to delete every row of {}",
                query.table_name()
            )));
        }
        let request = self
            .http
            .delete(self.table_url(query.table_name()))
            .query(&query.params());
        check(self.with_service_key(request).send().await?).await?;
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> ResultBackend<Option<AuthUser>> {
        let response = self
            .http
            .get(self.url("auth/v1/user"))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let user = check(response)
            .await?
            .json::<AuthResponse>()
            .await
            .map_err(|err| BackendError::Decode(format!("auth user: {err}")))?;

        let role = self.role_of(&user.id).await?;
        Ok(Some(AuthUser {
            id: user.id,
            email: user.email,
            role,
        }))
    }

    async fn remove_objects(&self, paths: &[String]) -> ResultBackend<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let request = self
            .http
            .delete(self.url(&format!("storage/v1/object/{}", self.storage_bucket)))
            .json(&json!({ "prefixes": paths }));
        let response = self.with_service_key(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("storage objects already gone: {paths:?}");
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }
}
