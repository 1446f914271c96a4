//! Bearer authentication and role checks.

use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use backend::{AuthUser, Role};

use crate::{ServerError, server::ServerState};

/// Roles allowed to send newsletter campaigns.
pub(crate) const CAMPAIGN_ROLES: &[Role] = &[Role::Admin, Role::Editor];

/// Roles allowed on the finance routes.
pub(crate) const FINANCE_ROLES: &[Role] = &[Role::Admin, Role::Finance];

/// Resolves the bearer token to an [`AuthUser`] and stores it in the request
/// extensions.
pub(crate) async fn authenticate(
    State(state): State<ServerState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(ServerError::Unauthorized);
    };
    let token = bearer.token().trim();
    if token.is_empty() {
        return Err(ServerError::Unauthorized);
    }

    let user = state
        .persistence
        .user_for_token(token)
        .await?
        .ok_or(ServerError::Unauthorized)?;
    tracing::debug!("authenticated {} as {}", user.id, user.role.as_str());

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub(crate) fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), ServerError> {
    if user.role.is_any_of(allowed) {
        Ok(())
    } else {
        tracing::warn!("user {} ({}) denied", user.id, user.role.as_str());
        Err(ServerError::Forbidden)
    }
}

pub(crate) async fn finance_only(
    Extension(user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    require_role(&user, FINANCE_ROLES)?;
    Ok(next.run(request).await)
}
