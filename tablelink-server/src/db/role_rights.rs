//! Role right queries, including the per-request permission check

use async_trait::async_trait;
use shared::models::{RoleRight, RoleRightCreate, RoleRightUpdate};
use sqlx::PgPool;

use super::{RepoResult, RoleRightRepository};
use crate::auth::permission::Action;

const RIGHT_COLUMNS: &str = "id, role_id, section, route, r_create, r_read, r_update, r_delete, \
     created_at, updated_at";

#[derive(Clone)]
pub struct PgRoleRightRepository {
    pool: PgPool,
}

impl PgRoleRightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRightRepository for PgRoleRightRepository {
    async fn is_granted(
        &self,
        role_id: i64,
        section: &str,
        route: &str,
        action: Action,
    ) -> RepoResult<bool> {
        // Column name comes from a fixed set, never from the request
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM role_rights
             WHERE role_id = $1 AND section = $2 AND route = $3 AND {} = TRUE",
            action.flag_column()
        ))
        .bind(role_id)
        .bind(section)
        .bind(route)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn list_for_role(&self, role_id: i64) -> RepoResult<Vec<RoleRight>> {
        let rights = sqlx::query_as(&format!(
            "SELECT {RIGHT_COLUMNS} FROM role_rights WHERE role_id = $1 ORDER BY section, route"
        ))
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rights)
    }

    async fn create(&self, role_id: i64, data: &RoleRightCreate) -> RepoResult<RoleRight> {
        let right = sqlx::query_as(&format!(
            "INSERT INTO role_rights (role_id, section, route, r_create, r_read, r_update, r_delete)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {RIGHT_COLUMNS}"
        ))
        .bind(role_id)
        .bind(&data.section)
        .bind(&data.route)
        .bind(data.r_create)
        .bind(data.r_read)
        .bind(data.r_update)
        .bind(data.r_delete)
        .fetch_one(&self.pool)
        .await?;
        Ok(right)
    }

    async fn update(
        &self,
        role_id: i64,
        right_id: i64,
        data: &RoleRightUpdate,
    ) -> RepoResult<Option<RoleRight>> {
        let right = sqlx::query_as(&format!(
            "UPDATE role_rights SET
                 r_create = COALESCE($3, r_create),
                 r_read = COALESCE($4, r_read),
                 r_update = COALESCE($5, r_update),
                 r_delete = COALESCE($6, r_delete),
                 updated_at = now()
             WHERE id = $2 AND role_id = $1
             RETURNING {RIGHT_COLUMNS}"
        ))
        .bind(role_id)
        .bind(right_id)
        .bind(data.r_create)
        .bind(data.r_read)
        .bind(data.r_update)
        .bind(data.r_delete)
        .fetch_optional(&self.pool)
        .await?;
        Ok(right)
    }

    async fn delete(&self, role_id: i64, right_id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM role_rights WHERE id = $1 AND role_id = $2")
            .bind(right_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
