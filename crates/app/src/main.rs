use std::{sync::Arc, time::Duration};

use backend::{DispatchSettings, RelayMailer, RestPersistence};
use server::{ServerOptions, ServerState};
use tokio::sync::watch;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "newsdesk={level},server={level},backend={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let persistence = RestPersistence::new(
        &settings.platform.url,
        &settings.platform.service_key,
        &settings.platform.storage_bucket,
    )?;
    let mailer = RelayMailer::new(
        &settings.mail.relay_url,
        &settings.mail.api_key,
        &settings.mail.from,
    )?;
    tracing::info!("Using platform at {}", settings.platform.url);

    let options = ServerOptions {
        dispatch: DispatchSettings {
            delay: Duration::from_millis(settings.newsletter.delay_ms),
            max_recipients: settings.newsletter.max_recipients,
        },
        welcome_email: settings.newsletter.welcome_email,
        contact_inbox: settings.mail.contact_inbox,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for interrupt: {err}");
            return;
        }
        tracing::info!("Interrupt received");
        if let Err(err) = shutdown_tx.send(true) {
            tracing::error!("failed to signal shutdown: {err}");
        }
    });

    let state = ServerState::new(Arc::new(persistence), Arc::new(mailer), options, shutdown_rx);
    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    server::run(state, &addr).await;

    Ok(())
}
