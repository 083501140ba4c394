//! User endpoints

use axum::{Extension, extract::State};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{User, UserCreate, UserUpdate};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::db::NewUser;
use crate::state::AppState;
use crate::util::hash_password;

use super::extract::{AppJson, AppPath};
use super::{ApiResult, internal, repo_error};

/// GET /users/user
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state.users.list().await.map_err(internal)?;
    Ok(ApiResponse::success(users))
}

/// POST /users/user
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<UserCreate>,
) -> ApiResult<User> {
    req.validate().map_err(|e| AppError::from_validation(&e))?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::new(ErrorCode::InternalError)
    })?;

    let user = state
        .users
        .create(NewUser {
            role_id: req.role_id,
            name: req.name,
            email: req.email,
            password_hash,
        })
        .await
        .map_err(repo_error(ErrorCode::UserEmailExists, ErrorCode::RoleNotFound))?;

    state.sessions.remember(&user).await;
    tracing::info!(user_id = user.id, role_id = user.role_id, "User created");
    Ok(ApiResponse::success(user))
}

/// PUT /users/user
///
/// Renames the caller; other fields cannot be changed here.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    AppJson(req): AppJson<UserUpdate>,
) -> ApiResult<User> {
    req.validate().map_err(|e| AppError::from_validation(&e))?;

    let user = state
        .users
        .update_name(current.id, &req.name)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    state.sessions.remember(&user).await;
    Ok(ApiResponse::success(user))
}

/// DELETE /users/user/{user_id}
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i64>,
) -> ApiResult<()> {
    if !state.users.delete(user_id).await.map_err(internal)? {
        return Err(AppError::new(ErrorCode::UserNotFound).with_detail("user_id", user_id));
    }

    state.sessions.forget(user_id).await;
    tracing::info!(user_id, "User deleted");
    Ok(ApiResponse::ok())
}
