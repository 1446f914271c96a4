use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{BackendError, MailError};

/// One message handed to the relay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    /// Overrides the relay's default sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

#[derive(Debug, Deserialize)]
struct RelayError {
    #[serde(alias = "error")]
    message: String,
}

/// Transactional mail relay reached over HTTP with a bearer API key.
#[derive(Clone, Debug)]
pub struct RelayMailer {
    http: Client,
    url: String,
    api_key: String,
    from: String,
}

impl RelayMailer {
    pub fn new(url: &str, api_key: &str, from: &str) -> Result<Self, BackendError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(BackendError::Config(format!(
                "mail relay url must be http(s): {url:?}"
            )));
        }
        if api_key.trim().is_empty() {
            return Err(BackendError::Config(
                "mail relay api key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            http: Client::new(),
            url: url.to_string(),
            api_key: api_key.trim().to_string(),
            from: from.trim().to_string(),
        })
    }

    fn with_sender(&self, mail: &OutgoingMail) -> OutgoingMail {
        let mut mail = mail.clone();
        if mail.from.is_none() {
            mail.from = Some(self.from.clone());
        }
        mail
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.with_sender(mail))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("mail relayed to {}", mail.to);
            return Ok(());
        }
        let message = response
            .json::<RelayError>()
            .await
            .map(|err| err.message)
            .unwrap_or_else(|_| "relay error".to_string());
        Err(MailError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
