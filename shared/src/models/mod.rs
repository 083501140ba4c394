//! Data models
//!
//! Shared between the server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL).

pub mod role;
pub mod role_right;
pub mod user;

// Re-exports
pub use role::*;
pub use role_right::*;
pub use user::*;
