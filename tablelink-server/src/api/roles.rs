//! Role and role-right endpoints

use axum::extract::State;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{Role, RoleCreate, RoleRight, RoleRightCreate, RoleRightUpdate, RoleUpdate};
use validator::Validate;

use crate::db::RepoError;
use crate::state::AppState;

use super::extract::{AppJson, AppPath};
use super::{ApiResult, internal, repo_error};

fn role_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::RoleNotFound).with_detail("role_id", id)
}

async fn require_role(state: &AppState, id: i64) -> Result<Role, AppError> {
    state
        .roles
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| role_not_found(id))
}

/// GET /roles
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    let roles = state.roles.list().await.map_err(internal)?;
    Ok(ApiResponse::success(roles))
}

/// GET /roles/{id}
pub async fn get_role(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> ApiResult<Role> {
    Ok(ApiResponse::success(require_role(&state, id).await?))
}

/// POST /roles
pub async fn create_role(
    State(state): State<AppState>,
    AppJson(req): AppJson<RoleCreate>,
) -> ApiResult<Role> {
    req.validate().map_err(|e| AppError::from_validation(&e))?;
    let role = state
        .roles
        .create(&req.name)
        .await
        .map_err(repo_error(ErrorCode::RoleNameExists, ErrorCode::ValidationFailed))?;
    tracing::info!(role_id = role.id, name = %role.name, "Role created");
    Ok(ApiResponse::success(role))
}

/// PUT /roles/{id}
pub async fn update_role(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<RoleUpdate>,
) -> ApiResult<Role> {
    req.validate().map_err(|e| AppError::from_validation(&e))?;
    let role = state
        .roles
        .update(id, &req.name)
        .await
        .map_err(repo_error(ErrorCode::RoleNameExists, ErrorCode::ValidationFailed))?
        .ok_or_else(|| role_not_found(id))?;

    // member snapshots carry the role name
    match state.users.ids_with_role(id).await {
        Ok(ids) => {
            for user_id in ids {
                state.sessions.forget(user_id).await;
            }
        }
        Err(e) => tracing::warn!(role_id = id, error = %e, "Failed to evict member snapshots"),
    }
    Ok(ApiResponse::success(role))
}

/// DELETE /roles/{id}
///
/// Refused while any user still has the role. The role's rights go with it.
pub async fn delete_role(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> ApiResult<()> {
    let users = state.roles.count_users(id).await.map_err(internal)?;
    if users > 0 {
        return Err(AppError::new(ErrorCode::RoleInUse).with_detail("users", users));
    }

    match state.roles.delete(id).await {
        Ok(true) => {}
        Ok(false) => return Err(role_not_found(id)),
        // A user was assigned between the count and the delete
        Err(RepoError::ForeignKey(_)) => return Err(AppError::new(ErrorCode::RoleInUse)),
        Err(e) => return Err(internal(e)),
    }

    tracing::info!(role_id = id, "Role deleted");
    Ok(ApiResponse::ok())
}

/// GET /roles/{id}/rights
pub async fn list_rights(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Vec<RoleRight>> {
    require_role(&state, id).await?;
    let rights = state.rights.list_for_role(id).await.map_err(internal)?;
    Ok(ApiResponse::success(rights))
}

/// POST /roles/{id}/rights
pub async fn create_right(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<RoleRightCreate>,
) -> ApiResult<RoleRight> {
    req.validate().map_err(|e| AppError::from_validation(&e))?;
    let right = state
        .rights
        .create(id, &req)
        .await
        .map_err(repo_error(ErrorCode::RoleRightExists, ErrorCode::RoleNotFound))?;
    tracing::info!(role_id = id, route = %right.route, "Role right created");
    Ok(ApiResponse::success(right))
}

/// PUT /roles/{id}/rights/{right_id}
pub async fn update_right(
    State(state): State<AppState>,
    AppPath((id, right_id)): AppPath<(i64, i64)>,
    AppJson(req): AppJson<RoleRightUpdate>,
) -> ApiResult<RoleRight> {
    let right = state
        .rights
        .update(id, right_id, &req)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::RoleRightNotFound))?;
    Ok(ApiResponse::success(right))
}

/// DELETE /roles/{id}/rights/{right_id}
pub async fn delete_right(
    State(state): State<AppState>,
    AppPath((id, right_id)): AppPath<(i64, i64)>,
) -> ApiResult<()> {
    if !state.rights.delete(id, right_id).await.map_err(internal)? {
        return Err(AppError::new(ErrorCode::RoleRightNotFound));
    }
    Ok(ApiResponse::ok())
}
