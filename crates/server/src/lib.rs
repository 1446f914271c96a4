use axum::{Json, http::StatusCode, response::IntoResponse};
use backend::BackendError;
use engine::EngineError;

use api_types::ErrorBody;
pub use server::{
    ServerOptions, ServerState, router, run, run_with_listener, spawn_with_listener,
};

mod auth;
mod contact;
mod finance;
mod newsletter;
mod server;

pub mod types {
    pub mod newsletter {
        pub use api_types::newsletter::{
            CampaignError, CampaignMode, CampaignRequest, CampaignResponse, SubscribeRequest,
            SubscribeResponse,
        };
    }

    pub mod contact {
        pub use api_types::contact::{ContactRequest, ContactResponse};
    }

    pub mod finance {
        pub use api_types::finance::{MovementDeleted, RangeQuery};
        pub use engine::{
            DashboardSnapshot, FinancialReport, Fund, Movement, MovementDraft, Project,
        };
    }
}

#[derive(Debug)]
pub enum ServerError {
    Unauthorized,
    Forbidden,
    Validation(String),
    Engine(EngineError),
    Backend(BackendError),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidDate(_)
        | EngineError::MissingTarget
        | EngineError::InvalidMovement(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Report(csv_err) => {
            tracing::error!("report export failed: {csv_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ServerError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ServerError::Validation(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Backend(err) => {
                tracing::error!("backend error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<BackendError> for ServerError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}
