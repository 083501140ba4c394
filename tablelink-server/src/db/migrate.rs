//! Embedded schema migrations
//!
//! `migrations/*.up.sql` is compiled into the binary. At startup every file
//! whose version (file name without `.up.sql`) is not yet recorded in the
//! `migrations` table is applied in version order, each in its own
//! transaction together with its bookkeeping row.

use std::collections::HashSet;

use include_dir::{Dir, include_dir};
use sqlx::PgPool;
use thiserror::Error;

static MIGRATIONS_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

const UP_SUFFIX: &str = ".up.sql";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration file {0} is not valid UTF-8")]
    InvalidFile(String),
    #[error("migration {version} failed: {source}")]
    Apply {
        version: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: String,
    pub sql: &'static str,
}

/// All embedded migrations, sorted by version
pub fn embedded() -> Result<Vec<Migration>, MigrationError> {
    let mut migrations = Vec::new();
    for file in MIGRATIONS_DIR.files() {
        let Some(name) = file.path().file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(version) = name.strip_suffix(UP_SUFFIX) else {
            continue;
        };
        let sql = file
            .contents_utf8()
            .ok_or_else(|| MigrationError::InvalidFile(name.to_string()))?;
        migrations.push(Migration {
            version: version.to_string(),
            sql,
        });
    }
    migrations.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(migrations)
}

/// Migrations not yet in `applied`, in the order they must run
pub fn pending<'a>(all: &'a [Migration], applied: &HashSet<String>) -> Vec<&'a Migration> {
    all.iter().filter(|m| !applied.contains(&m.version)).collect()
}

/// Apply every pending migration; returns how many ran
pub async fn run(pool: &PgPool) -> Result<usize, MigrationError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
             version VARCHAR(255) PRIMARY KEY,
             applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
         )",
    )
    .execute(pool)
    .await?;

    let applied: HashSet<String> = sqlx::query_scalar("SELECT version FROM migrations")
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    let all = embedded()?;
    let todo = pending(&all, &applied);

    for migration in &todo {
        apply(pool, migration)
            .await
            .map_err(|source| MigrationError::Apply {
                version: migration.version.clone(),
                source,
            })?;
        tracing::info!(version = %migration.version, "Applied migration");
    }

    Ok(todo.len())
}

async fn apply(pool: &PgPool, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO migrations (version) VALUES ($1)")
        .bind(&migration.version)
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}
