//! Authentication and authorization
//!
//! - `session`: login, token validation and logout against the session cache
//! - `bearer`: `section` and `Authorization` header parsing
//! - `middleware`: authenticate / authorize layers for protected routes
//! - `permission`: HTTP verb to role-right flag mapping
//! - `rate_limit`: per-IP login throttling

pub mod bearer;
pub mod middleware;
pub mod permission;
pub mod rate_limit;
pub mod session;

pub use middleware::CurrentUser;
pub use session::SessionService;
