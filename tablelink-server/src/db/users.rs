//! User queries

use async_trait::async_trait;
use shared::models::User;
use sqlx::PgPool;

use super::{NewUser, RepoResult, UserCredentials, UserRepository};

const USER_COLUMNS: &str = "u.id, u.role_id, r.name AS role_name, u.name, u.email, \
     u.last_access, u.created_at, u.updated_at";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, u.password AS password_hash
             FROM users u LEFT JOIN roles r ON r.id = u.role_id
             WHERE u.email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserCredentials {
            user: r.user,
            password_hash: r.password_hash,
        }))
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}
             FROM users u LEFT JOIN roles r ON r.id = u.role_id
             WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}
             FROM users u LEFT JOIN roles r ON r.id = u.role_id
             ORDER BY u.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as(&format!(
            "WITH u AS (
                 INSERT INTO users (role_id, name, email, password)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *
             )
             SELECT {USER_COLUMNS} FROM u LEFT JOIN roles r ON r.id = u.role_id"
        ))
        .bind(user.role_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_name(&self, id: i64, name: &str) -> RepoResult<Option<User>> {
        let updated = sqlx::query_as(&format!(
            "WITH u AS (
                 UPDATE users SET name = $2, updated_at = now()
                 WHERE id = $1
                 RETURNING *
             )
             SELECT {USER_COLUMNS} FROM u LEFT JOIN roles r ON r.id = u.role_id"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn touch_last_access(&self, id: i64) -> RepoResult<()> {
        sqlx::query("UPDATE users SET last_access = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ids_with_role(&self, role_id: i64) -> RepoResult<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT id FROM users WHERE role_id = $1")
            .bind(role_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
