//! Role queries

use async_trait::async_trait;
use shared::models::Role;
use sqlx::PgPool;

use super::{RepoResult, RoleRepository};

#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn list(&self) -> RepoResult<Vec<Role>> {
        let roles = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM roles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn create(&self, name: &str) -> RepoResult<Role> {
        let role = sqlx::query_as(
            "INSERT INTO roles (name) VALUES ($1)
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(role)
    }

    async fn update(&self, id: i64, name: &str) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as(
            "UPDATE roles SET name = $2, updated_at = now() WHERE id = $1
             RETURNING id, name, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn count_users(&self, id: i64) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
