//! API routes for tablelink-server
//!
//! Public: `/health`, `/auth/login` (rate-limited), `/auth/logout`.
//! Everything else requires `section: be`, a valid bearer token, and a role
//! right for the matched route template and verb.

pub mod auth;
pub mod extract;
pub mod health;
pub mod roles;
pub mod users;


use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};
use shared::error::{ApiResponse, AppError, ErrorCode};

use crate::auth::middleware::{authenticate, authorize};
use crate::auth::rate_limit::login_rate_limit;
use crate::db::RepoError;
use crate::error::ServiceError;
use crate::state::AppState;

type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Map an infrastructure failure to a logged 500
fn internal(e: RepoError) -> AppError {
    ServiceError::from(e).into()
}

/// Map constraint violations to domain error codes, anything else to [`internal`]
fn repo_error(conflict: ErrorCode, foreign_key: ErrorCode) -> impl Fn(RepoError) -> AppError {
    move |e| match e {
        RepoError::Conflict(_) => AppError::new(conflict),
        RepoError::ForeignKey(_) => AppError::new(foreign_key),
        other => internal(other),
    }
}

pub fn router(state: AppState) -> Router {
    // Layers run bottom-up: authenticate, then authorize
    let protected = Router::new()
        .route(
            "/users/user",
            get(users::list_users)
                .post(users::create_user)
                .put(users::update_user),
        )
        .route("/users/user/{user_id}", delete(users::delete_user))
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/roles/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        .route(
            "/roles/{id}/rights",
            get(roles::list_rights).post(roles::create_right),
        )
        .route(
            "/roles/{id}/rights/{right_id}",
            put(roles::update_right).delete(roles::delete_right),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let login = Router::new()
        .route("/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/logout", post(auth::logout))
        .merge(login)
        .merge(protected)
        .with_state(state)
}
