//! Collaborators of the back-office: the hosted persistence/auth/storage
//! platform, the mail relay and the newsletter dispatcher.

use async_trait::async_trait;
use serde_json::Value;

pub use auth::{AuthUser, Role};
pub use dispatch::{
    CampaignMessage, DispatchReport, DispatchSettings, Recipient, RecipientError, send_campaign,
};
pub use error::{BackendError, MailError};
pub use mail::{Mailer, OutgoingMail, RelayMailer};
pub use query::{Order, Query};
pub use rest::RestPersistence;

mod auth;
mod dispatch;
mod error;
mod mail;
mod query;
mod rest;

pub type ResultBackend<T> = Result<T, BackendError>;

/// Table names used by the back-office.
pub mod tables {
    pub const FUNDS: &str = "funds";
    pub const PROJECTS: &str = "projects";
    pub const MOVEMENTS: &str = "movements";
    pub const MOVEMENT_ATTACHMENTS: &str = "movement_attachments";
    pub const BUDGET_ITEMS: &str = "budget_items";
    pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletter_subscribers";
    pub const NEWSLETTER_CAMPAIGNS: &str = "newsletter_campaigns";
    pub const CONTACT_MESSAGES: &str = "contact_messages";
    pub const PROFILES: &str = "profiles";
}

/// Generic row store with auth lookup and object storage.
///
/// Rows are loosely-typed JSON objects; typing happens in the engine's
/// normaliser.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn select(&self, query: Query) -> ResultBackend<Vec<Value>>;

    /// Inserts one row and returns it as stored.
    async fn insert(&self, table: &str, row: Value) -> ResultBackend<Value>;

    /// Inserts or merges one row on the `on_conflict` column and returns it
    /// as stored.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> ResultBackend<Value>;

    /// Patches every row matched by `query` and returns the updated rows.
    async fn update(&self, query: Query, patch: Value) -> ResultBackend<Vec<Value>>;

    async fn delete(&self, query: Query) -> ResultBackend<()>;

    /// Resolves a bearer token; `None` when the token is not valid.
    async fn user_for_token(&self, token: &str) -> ResultBackend<Option<AuthUser>>;

    /// Removes stored objects by path. Missing objects are not an error.
    async fn remove_objects(&self, paths: &[String]) -> ResultBackend<()>;
}
