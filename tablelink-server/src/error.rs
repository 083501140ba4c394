//! Unified service-layer error type for tablelink-server
//!
//! `ServiceError` bridges repository and cache errors into the API-layer
//! `AppError`, so handlers can use `?` and infrastructure failures are logged
//! exactly once on their way out.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::cache::CacheError;
use crate::db::RepoError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: database failures (logged, mapped to DatabaseError)
/// - `Cache`: session cache failures (logged, mapped to CacheError)
/// - `App`: business-rule errors, passed through to the client unchanged
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    Cache(CacheError),
    App(AppError),
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Database(inner) => ServiceError::Db(inner.into()),
            RepoError::Conflict(constraint) => {
                tracing::warn!(%constraint, "Unique constraint violated");
                ServiceError::App(AppError::new(ErrorCode::AlreadyExists))
            }
            RepoError::ForeignKey(constraint) => {
                tracing::warn!(%constraint, "Foreign key constraint violated");
                ServiceError::App(AppError::new(ErrorCode::ValidationFailed))
            }
        }
    }
}

impl From<CacheError> for ServiceError {
    fn from(e: CacheError) -> Self {
        ServiceError::Cache(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
            ServiceError::Cache(cache_err) => {
                tracing::error!(error = %cache_err, "Service cache error");
                AppError::new(ErrorCode::CacheError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors_hide_details() {
        let err: AppError = ServiceError::Db("relation \"users\" does not exist".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("users"));

        let err: AppError = ServiceError::from(CacheError::Timeout).into();
        assert_eq!(err.code, ErrorCode::CacheError);
    }

    #[test]
    fn test_repo_errors_map_to_client_errors() {
        let err: AppError = ServiceError::from(RepoError::Conflict("users_email_key".into())).into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);
        assert!(!err.message.contains("users_email_key"));
        assert!(err.details.is_none());

        let err: AppError =
            ServiceError::from(RepoError::ForeignKey("users_role_id_fkey".into())).into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(!err.message.contains("users_role_id_fkey"));
    }

    #[test]
    fn test_app_errors_pass_through() {
        let err: AppError = ServiceError::from(AppError::invalid_token()).into();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }
}
