//! Schema setup for the key-value store.
//!
//! The schema version is SQLite's `user_version` pragma. Each migration runs
//! in one transaction together with the version bump, so a crash leaves the
//! database at the previous version.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to read schema version: {0}")]
    Version(#[source] sqlx::Error),

    #[error("Migration {version} ({description}) failed: {source}")]
    Apply {
        version: i64,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Every schema change, in version order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "key-value store",
    sql: include_str!("../../../migrations/001_kv_store.sql"),
}];

pub async fn schema_version(pool: &SqlitePool) -> Result<i64, MigrationError> {
    sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(MigrationError::Version)
}

/// Apply every migration newer than the stored schema version.
///
/// Returns the number applied.
pub async fn migrate(pool: &SqlitePool) -> Result<usize, MigrationError> {
    let current = schema_version(pool).await?;
    let mut applied = 0;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(pool, migration).await?;
        debug!(version = migration.version, description = migration.description, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<(), MigrationError> {
    let failed = |source| MigrationError::Apply {
        version: migration.version,
        description: migration.description,
        source,
    };

    let mut tx = pool.begin().await.map_err(failed)?;
    for statement in migration.sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(&mut *tx).await.map_err(failed)?;
    }

    // PRAGMA does not accept bound parameters
    let bump = format!("PRAGMA user_version = {}", migration.version);
    sqlx::query(&bump).execute(&mut *tx).await.map_err(failed)?;

    tx.commit().await.map_err(failed)
}
