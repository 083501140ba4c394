//! Request header checks for protected routes
//!
//! Malformed headers are authentication failures (401), never 400.

use http::HeaderMap;
use http::header::AUTHORIZATION;
use shared::error::{AppError, ErrorCode};
use shared::models::SECTION_BACKEND;

pub const SECTION_HEADER: &str = "section";

/// Require `section: be`
pub fn check_section(headers: &HeaderMap) -> Result<(), AppError> {
    match headers.get(SECTION_HEADER).map(|v| v.as_bytes()) {
        Some(value) if value == SECTION_BACKEND.as_bytes() => Ok(()),
        _ => Err(AppError::new(ErrorCode::SectionInvalid)),
    }
}

/// Extract the token from `Authorization: Bearer <token>`
///
/// The header must split on single spaces into exactly two parts, the first
/// being exactly `Bearer` and the second non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(AppError::not_authenticated)?;
    let value = value
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::InvalidAuthHeader))?;
    if value.is_empty() {
        return Err(AppError::not_authenticated());
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AppError::new(ErrorCode::InvalidAuthHeader)),
    }
}
