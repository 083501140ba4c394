//! Session key scheme
//!
//! - `token:<token>` → user id
//! - `user:<id>` → JSON user snapshot (never contains the password)
//!
//! Both are written with the same TTL and are never renewed on read.

use std::sync::Arc;
use std::time::Duration;

use shared::models::User;

use super::{CacheBackend, CacheResult};

fn user_key(user_id: i64) -> String {
    format!("user:{user_id}")
}

fn token_key(token: &str) -> String {
    format!("token:{token}")
}

#[derive(Clone)]
pub struct SessionCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub async fn set_user(&self, user: &User) -> CacheResult<()> {
        let json = serde_json::to_string(user)?;
        self.backend.set_ex(&user_key(user.id), &json, self.ttl).await
    }

    /// Cached snapshot for `user_id`
    ///
    /// A snapshot that no longer decodes is treated as a miss so the caller
    /// falls back to the store and rewrites it.
    pub async fn get_user(&self, user_id: i64) -> CacheResult<Option<User>> {
        let Some(json) = self.backend.get(&user_key(user_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Discarding undecodable user snapshot");
                Ok(None)
            }
        }
    }

    pub async fn delete_user(&self, user_id: i64) -> CacheResult<()> {
        self.backend.delete(&user_key(user_id)).await
    }

    pub async fn set_token(&self, token: &str, user_id: i64) -> CacheResult<()> {
        self.backend
            .set_ex(&token_key(token), &user_id.to_string(), self.ttl)
            .await
    }

    /// User id the token maps to, or `None` for unknown or expired tokens
    pub async fn user_id_for_token(&self, token: &str) -> CacheResult<Option<i64>> {
        let Some(raw) = self.backend.get(&token_key(token)).await? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                tracing::warn!("Token mapping holds a non-numeric user id");
                Ok(None)
            }
        }
    }

    pub async fn delete_token(&self, token: &str) -> CacheResult<()> {
        self.backend.delete(&token_key(token)).await
    }
}
