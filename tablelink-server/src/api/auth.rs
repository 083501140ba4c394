//! Login and logout

use axum::{Json, extract::State};
use http::HeaderMap;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{LoginRequest, LoginResponse};

use crate::auth::bearer::bearer_token;
use crate::state::AppState;

use super::extract::AppJson;

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = state.sessions.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        status: true,
        message: ErrorCode::Success.message().to_string(),
        access_token: Some(token),
    }))
}

/// POST /auth/logout
///
/// Needs only the bearer header; the `section` header is not checked here.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ApiResponse<()>, AppError> {
    let token = bearer_token(&headers)?;
    state.sessions.logout(token).await?;
    Ok(ApiResponse::ok())
}
