//! Token sessions
//!
//! Login issues an opaque token mapped to a user id in the session cache.
//! Validation is cache-first: the token resolves to a user id, the user
//! snapshot comes from the cache, and the store is only consulted when the
//! snapshot is missing.
//!
//! The cache writes at login are not atomic as a group. A failed snapshot
//! write is tolerated (validation falls back to the store); a failed token
//! write fails the login. Any partial state expires with the TTL.

use std::sync::Arc;

use shared::error::AppError;
use shared::models::User;

use crate::cache::SessionCache;
use crate::db::UserRepository;
use crate::error::ServiceResult;
use crate::util::{generate_token, verify_dummy_password, verify_password};

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    cache: SessionCache,
}

impl SessionService {
    pub fn new(users: Arc<dyn UserRepository>, cache: SessionCache) -> Self {
        Self { users, cache }
    }

    /// Check credentials and issue a new token
    ///
    /// Earlier tokens of the same user stay valid.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        let user = match self.users.find_credentials(email).await? {
            Some(found) if verify_password(password, &found.password_hash) => found.user,
            Some(found) => {
                tracing::warn!(user_id = found.user.id, "Login failed: wrong password");
                return Err(AppError::invalid_credentials().into());
            }
            None => {
                verify_dummy_password(password);
                tracing::warn!("Login failed: unknown email");
                return Err(AppError::invalid_credentials().into());
            }
        };

        let token = generate_token();

        if let Err(e) = self.cache.set_user(&user).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to cache user snapshot at login");
        }
        self.cache.set_token(&token, user.id).await?;
        self.users.touch_last_access(user.id).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Resolve a token to its user
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let Some(user_id) = self.cache.user_id_for_token(token).await? else {
            return Err(AppError::invalid_token().into());
        };

        if let Some(user) = self.cache.get_user(user_id).await? {
            return Ok(user);
        }

        let Some(user) = self.users.find_by_id(user_id).await? else {
            tracing::warn!(user_id, "Token refers to a user that no longer exists");
            return Err(AppError::invalid_token().into());
        };
        self.remember(&user).await;
        Ok(user)
    }

    /// Drop the token and its user's snapshot; unknown tokens are a no-op
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        let Some(user_id) = self.cache.user_id_for_token(token).await? else {
            return Ok(());
        };
        self.cache.delete_user(user_id).await?;
        self.cache.delete_token(token).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Refresh a user's snapshot, logging instead of failing
    pub async fn remember(&self, user: &User) {
        if let Err(e) = self.cache.set_user(user).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to refresh user snapshot");
        }
    }

    /// Evict a user's snapshot, logging instead of failing
    pub async fn forget(&self, user_id: i64) {
        if let Err(e) = self.cache.delete_user(user_id).await {
            tracing::warn!(user_id, error = %e, "Failed to evict user snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use crate::cache::faulty::FaultyCache;
    use crate::db::memory::MemoryStore;
    use shared::error::ErrorCode;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    struct Fixture {
        store: MemoryStore,
        backend: FaultyCache,
        sessions: SessionService,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        store.seed_role(2, "staff");
        store.seed_user(1, 2, "Alice", "a@x.com", "p");
        let backend = FaultyCache::new();
        let sessions = SessionService::new(
            Arc::new(store.clone()),
            SessionCache::new(Arc::new(backend.clone()), TTL),
        );
        Fixture {
            store,
            backend,
            sessions,
        }
    }

    fn code(err: crate::error::ServiceError) -> ErrorCode {
        AppError::from(err).code
    }

    #[tokio::test]
    async fn test_login_then_authenticate_resolves_same_user() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        assert_eq!(token.len(), 43);

        let user = f.sessions.authenticate(&token).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.role_id, 2);
        assert!(f.store.last_access(1).is_some());
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let f = fixture();
        let wrong_password = f.sessions.login("a@x.com", "nope").await.unwrap_err();
        let unknown_email = f.sessions.login("b@x.com", "p").await.unwrap_err();

        let wrong_password = AppError::from(wrong_password);
        let unknown_email = AppError::from(unknown_email);
        assert_eq!(wrong_password.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong_password.code, unknown_email.code);
        assert_eq!(wrong_password.message, unknown_email.message);
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let f = fixture();
        let err = f.sessions.authenticate("never-issued").await.unwrap_err();
        assert_eq!(code(err), ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        f.sessions.logout(&token).await.unwrap();

        let err = f.sessions.authenticate(&token).await.unwrap_err();
        assert_eq!(code(err), ErrorCode::TokenInvalid);
        assert!(f.backend.get("user:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_of_unknown_token_is_noop() {
        let f = fixture();
        f.sessions.logout("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_tokens_are_independent() {
        let f = fixture();
        let first = f.sessions.login("a@x.com", "p").await.unwrap();
        let second = f.sessions.login("a@x.com", "p").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(f.sessions.authenticate(&first).await.unwrap().id, 1);
        assert_eq!(f.sessions.authenticate(&second).await.unwrap().id, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_expires_after_ttl() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(f.sessions.authenticate(&token).await.is_ok());

        tokio::time::advance(Duration::from_secs(1)).await;
        let err = f.sessions.authenticate(&token).await.unwrap_err();
        assert_eq!(code(err), ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn test_snapshot_miss_falls_back_to_store() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        f.backend.delete("user:1").await.unwrap();

        let user = f.sessions.authenticate(&token).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(f.backend.get("user:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleted_user_token_is_rejected() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        f.backend.delete("user:1").await.unwrap();
        f.store.remove_user(1);

        let err = f.sessions.authenticate(&token).await.unwrap_err();
        assert_eq!(code(err), ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let f = fixture();
        f.store.set_unavailable(true);
        let err = f.sessions.login("a@x.com", "p").await.unwrap_err();
        assert_eq!(code(err), ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn test_login_survives_snapshot_write_failure() {
        let f = fixture();
        f.backend.fail_writes("user:");

        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        assert!(f.backend.get("user:1").await.unwrap().is_none());

        let user = f.sessions.authenticate(&token).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_login_fails_when_token_cannot_be_stored() {
        let f = fixture();
        f.backend.fail_writes("token:");

        let err = AppError::from(f.sessions.login("a@x.com", "p").await.unwrap_err());
        assert_eq!(err.code, ErrorCode::CacheError);
        assert_eq!(err.http_status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(f.store.last_access(1).is_none());
    }

    #[tokio::test]
    async fn test_token_read_failure_is_internal_not_unauthorized() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        f.backend.fail_reads("token:");

        let err = f.sessions.authenticate(&token).await.unwrap_err();
        assert_eq!(code(err), ErrorCode::CacheError);

        f.backend.heal();
        assert_eq!(f.sessions.authenticate(&token).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_remember_and_forget_swallow_cache_errors() {
        let f = fixture();
        let token = f.sessions.login("a@x.com", "p").await.unwrap();
        let user = f.sessions.authenticate(&token).await.unwrap();
        f.backend.fail_writes("user:");
        f.backend.fail_deletes("user:");

        f.sessions.remember(&user).await;
        f.sessions.forget(user.id).await;
        assert!(f.backend.get("user:1").await.unwrap().is_some());
    }
}
