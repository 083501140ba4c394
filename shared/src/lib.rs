//! Shared types for tablelink
//!
//! Error codes, the unified API response envelope and the user/role data
//! models used by the server and by API clients.

pub mod error;
pub mod models;

// Re-exports
pub use axum::Json;
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
