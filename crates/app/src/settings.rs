//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` (or the file named by `NEWSDESK_CONFIG`) and
//! overridden by `NEWSDESK__SECTION__KEY` environment variables.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Platform {
    pub url: String,
    pub service_key: String,
    pub storage_bucket: String,
}

#[derive(Debug, Deserialize)]
pub struct Mail {
    pub relay_url: String,
    pub api_key: String,
    pub from: String,
    /// Institutional address receiving contact form messages.
    pub contact_inbox: String,
}

#[derive(Debug, Deserialize)]
pub struct Newsletter {
    pub delay_ms: u64,
    pub max_recipients: usize,
    pub welcome_email: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub platform: Platform,
    pub mail: Mail,
    pub newsletter: Newsletter,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path =
            std::env::var("NEWSDESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("platform.storage_bucket", "anexos")?
            .set_default("mail.from", "newsletter@localhost")?
            .set_default("newsletter.delay_ms", 600)?
            .set_default("newsletter.max_recipients", 500)?
            .set_default("newsletter.welcome_email", true)?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("NEWSDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
