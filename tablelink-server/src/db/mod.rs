//! Database access layer
//!
//! Repository traits are the seam between handlers and storage: Postgres
//! implementations for the server, in-memory ones for router tests.

pub mod migrate;
pub mod role_rights;
pub mod roles;
pub mod users;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use shared::models::{Role, RoleRight, RoleRightCreate, RoleRightUpdate, User};
use thiserror::Error;

use crate::auth::permission::Action;

pub use role_rights::PgRoleRightRepository;
pub use roles::PgRoleRepository;
pub use users::PgUserRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    /// Unique constraint violated; carries the constraint name when known
    #[error("conflicts with an existing record: {0}")]
    Conflict(String),
    /// Foreign key constraint violated
    #[error("referenced record is missing or still in use: {0}")]
    ForeignKey(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return RepoError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return RepoError::ForeignKey(constraint);
            }
        }
        RepoError::Database(e)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// A user together with the stored password hash
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Fields for inserting a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub role_id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up the single user with `email` along with the password hash
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;
    async fn list(&self) -> RepoResult<Vec<User>>;
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    /// Returns `None` when the user no longer exists
    async fn update_name(&self, id: i64, name: &str) -> RepoResult<Option<User>>;
    async fn touch_last_access(&self, id: i64) -> RepoResult<()>;
    /// Ids of the users assigned to `role_id`
    async fn ids_with_role(&self, role_id: i64) -> RepoResult<Vec<i64>>;
    /// Returns `false` when nothing was deleted
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list(&self) -> RepoResult<Vec<Role>>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
    async fn create(&self, name: &str) -> RepoResult<Role>;
    async fn update(&self, id: i64, name: &str) -> RepoResult<Option<Role>>;
    /// Number of users assigned to the role
    async fn count_users(&self, id: i64) -> RepoResult<i64>;
    /// Deletes the role and its rights; fails with `ForeignKey` while users reference it
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait RoleRightRepository: Send + Sync {
    /// Whether a right row for (role, section, route) has the flag for `action` set
    async fn is_granted(
        &self,
        role_id: i64,
        section: &str,
        route: &str,
        action: Action,
    ) -> RepoResult<bool>;
    async fn list_for_role(&self, role_id: i64) -> RepoResult<Vec<RoleRight>>;
    async fn create(&self, role_id: i64, data: &RoleRightCreate) -> RepoResult<RoleRight>;
    async fn update(
        &self,
        role_id: i64,
        right_id: i64,
        data: &RoleRightUpdate,
    ) -> RepoResult<Option<RoleRight>>;
    async fn delete(&self, role_id: i64, right_id: i64) -> RepoResult<bool>;
}
