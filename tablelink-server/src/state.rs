//! Application state for tablelink-server

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::auth::SessionService;
use crate::auth::rate_limit::RateLimiter;
use crate::cache::{CacheBackend, MemoryCache, RedisCache, SessionCache};
use crate::config::{BootstrapAdmin, CacheBackendKind, Config};
use crate::db::{
    self, NewUser, PgRoleRepository, PgRoleRightRepository, PgUserRepository, RoleRepository,
    RoleRightRepository, UserRepository,
};
use crate::util::hash_password;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Role the migrations seed with every right
pub const ADMIN_ROLE: &str = "admin";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reported by /health
    pub service_name: String,
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub rights: Arc<dyn RoleRightRepository>,
    /// Token issuance and validation
    pub sessions: SessionService,
    /// Login throttling
    pub rate_limiter: RateLimiter,
    /// Set when sessions live in process memory; purged periodically by `main`
    pub local_cache: Option<MemoryCache>,
}

impl AppState {
    /// Connect to Postgres and the session cache, run migrations and seed the admin
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pg_max_pool_size)
            .min_connections(config.pg_max_idle_connections)
            .idle_timeout(Some(config.pg_max_idle_time))
            .max_lifetime(Some(config.pg_max_life_time))
            .acquire_timeout(config.pg_acquire_timeout)
            .connect(&config.database_url)
            .await?;
        tracing::info!(
            max_connections = config.pg_max_pool_size,
            "Connected to PostgreSQL"
        );

        let applied = db::migrate::run(&pool).await?;
        tracing::info!(applied, "Migrations up to date");

        let (backend, local_cache): (Arc<dyn CacheBackend>, Option<MemoryCache>) =
            match config.cache_backend {
                CacheBackendKind::Redis => {
                    let redis = RedisCache::connect(
                        &config.redis_addr,
                        config.redis_password.as_deref(),
                        config.redis_db,
                        config.cache_timeout,
                    )
                    .await?;
                    (Arc::new(redis), None)
                }
                CacheBackendKind::Memory => {
                    tracing::warn!("Using in-process session cache; sessions are not shared");
                    let memory = MemoryCache::new();
                    (Arc::new(memory.clone()), Some(memory))
                }
            };

        let mut state = Self::from_parts(
            config.service_name.clone(),
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgRoleRepository::new(pool.clone())),
            Arc::new(PgRoleRightRepository::new(pool)),
            SessionCache::new(backend, config.session_ttl),
            RateLimiter::new(config.login_rate_limit),
        );
        state.local_cache = local_cache;

        if let Some(admin) = &config.bootstrap_admin {
            state.ensure_admin(admin).await?;
        }

        Ok(state)
    }

    pub fn from_parts(
        service_name: String,
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        rights: Arc<dyn RoleRightRepository>,
        sessions: SessionCache,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            service_name,
            sessions: SessionService::new(users.clone(), sessions),
            users,
            roles,
            rights,
            rate_limiter,
            local_cache: None,
        }
    }

    /// Create the bootstrap admin unless a user with that email already exists
    ///
    /// Returns whether a user was created.
    pub async fn ensure_admin(&self, admin: &BootstrapAdmin) -> Result<bool, BoxError> {
        if self.users.find_credentials(&admin.email).await?.is_some() {
            return Ok(false);
        }
        let role = self
            .roles
            .find_by_name(ADMIN_ROLE)
            .await?
            .ok_or("admin role missing; migrations did not seed it")?;

        let user = self
            .users
            .create(NewUser {
                role_id: role.id,
                name: "Administrator".to_string(),
                email: admin.email.clone(),
                password_hash: hash_password(&admin.password)
                    .map_err(|e| format!("failed to hash bootstrap password: {e}"))?,
            })
            .await?;
        tracing::info!(user_id = user.id, email = %user.email, "Created bootstrap admin");
        Ok(true)
    }
}
