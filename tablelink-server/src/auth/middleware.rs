//! Authenticate / authorize layers for protected routes
//!
//! Both run as `route_layer`s so the matched route template is known.
//! `authenticate` must be the outer layer: `authorize` reads the
//! [`CurrentUser`] it inserts.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::AppError;
use shared::models::{SECTION_BACKEND, User};

use crate::auth::bearer::{bearer_token, check_section};
use crate::auth::permission::Action;
use crate::state::AppState;

/// The authenticated caller, available to handlers as `Extension<CurrentUser>`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve the bearer token to a user and attach it to the request
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_owned();
    if let Err(e) = check_section(request.headers()) {
        tracing::warn!(%path, "Rejected request without backend section");
        return Err(e);
    }
    let token = bearer_token(request.headers())
        .inspect_err(|e| tracing::warn!(%path, reason = %e.message, "Rejected authorization header"))?
        .to_owned();

    let user = state.sessions.authenticate(&token).await.map_err(|e| {
        let err = AppError::from(e);
        tracing::warn!(%path, code = %err.code, "Token validation failed");
        err
    })?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Allow the request only if the caller's role has the right for this route and verb
pub async fn authorize(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>().cloned() else {
        return Err(AppError::not_authenticated());
    };
    let method = request.method().clone();

    let Some(route) = request.extensions().get::<MatchedPath>().cloned() else {
        tracing::warn!(user_id = user.id, %method, "Permission denied: no matched route");
        return Err(AppError::permission_denied("Permission denied"));
    };
    let Some(action) = Action::from_method(&method) else {
        tracing::warn!(user_id = user.id, route = route.as_str(), %method, "Permission denied: unsupported method");
        return Err(AppError::permission_denied("Permission denied"));
    };

    let granted = state
        .rights
        .is_granted(user.role_id, SECTION_BACKEND, route.as_str(), action)
        .await
        .map_err(|e| AppError::from(crate::error::ServiceError::from(e)))?;

    if !granted {
        tracing::warn!(
            user_id = user.id,
            role_id = user.role_id,
            route = route.as_str(),
            %method,
            "Permission denied"
        );
        return Err(AppError::permission_denied("Permission denied"));
    }

    tracing::debug!(user_id = user.id, route = route.as_str(), %method, "Permission granted");
    Ok(next.run(request).await)
}
