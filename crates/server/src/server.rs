use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use backend::{DispatchSettings, Mailer, Persistence};
use tokio::sync::watch;

use std::sync::Arc;

use crate::{auth, contact, finance, newsletter};

/// Behaviour knobs of the public endpoints.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub dispatch: DispatchSettings,
    /// Send a welcome mail on subscription.
    pub welcome_email: bool,
    /// Address contact submissions are relayed to.
    pub contact_inbox: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            dispatch: DispatchSettings::default(),
            welcome_email: true,
            contact_inbox: String::new(),
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub persistence: Arc<dyn Persistence>,
    pub mailer: Arc<dyn Mailer>,
    pub options: Arc<ServerOptions>,
    /// Flips to `true` on shutdown; running campaigns stop at the next
    /// recipient.
    pub shutdown: watch::Receiver<bool>,
}

impl ServerState {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        mailer: Arc<dyn Mailer>,
        options: ServerOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            persistence,
            mailer,
            options: Arc::new(options),
            shutdown,
        }
    }
}

pub fn router(state: ServerState) -> Router {
    let finance = Router::new()
        .route("/finance/funds", get(finance::funds))
        .route("/finance/projects", get(finance::projects))
        .route("/finance/dashboard", get(finance::dashboard))
        .route("/finance/report", get(finance::report))
        .route("/finance/movements/export", get(finance::export_movements))
        .route("/finance/movements", post(finance::save_movement))
        .route("/finance/movements/{id}", delete(finance::delete_movement))
        .route_layer(middleware::from_fn(auth::finance_only));

    let protected = Router::new()
        .route(
            "/newsletter-send-campaign",
            post(newsletter::send_campaign),
        )
        .merge(finance)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    Router::new()
        .route("/newsletter-subscribe", post(newsletter::subscribe))
        .route("/contact-submit", post(contact::submit))
        .merge(protected)
        .with_state(state)
}

pub async fn run(state: ServerState, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let mut shutdown = state.shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let requested = shutdown.wait_for(|stop| *stop).await.is_ok();
            if !requested {
                // Sender dropped without a shutdown request: serve forever.
                std::future::pending::<()>().await;
            }
            tracing::info!("Server shutting down");
        })
        .await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
