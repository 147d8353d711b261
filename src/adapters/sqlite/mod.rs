//! SQLite storage adapters.

pub mod connection;
pub mod key_value_store;
pub mod migrations;

pub use connection::{create_pool, create_test_pool, ConnectionError, DatabaseLocation, PoolConfig};
pub use key_value_store::SqliteKeyValueStore;
pub use migrations::{migrate, schema_version, Migration, MigrationError, MIGRATIONS};

use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// Open (creating if needed) and migrate the database at `location`.
pub async fn initialize_database(
    location: &DatabaseLocation,
    config: &PoolConfig,
) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(location, config).await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    migrate(&pool).await?;
    Ok(pool)
}
