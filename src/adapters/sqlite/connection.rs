//! Opening the SQLite database behind the key-value store.
//!
//! The configured `storage.path` may be a bare file path, a `sqlite:` URL,
//! or `:memory:`. File databases run in WAL mode and get their parent
//! directory created on first open.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::StorageConfig;

const MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to open database {location}: {source}")]
    Open {
        location: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to create database directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Private in-memory database, gone when the pool closes
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Interpret a configured storage path
    pub fn parse(raw: &str) -> Self {
        let path = raw
            .strip_prefix("sqlite://")
            .or_else(|| raw.strip_prefix("sqlite:"))
            .unwrap_or(raw);

        if path.is_empty() || path == MEMORY {
            Self::Memory
        } else {
            Self::File(PathBuf::from(path))
        }
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, ConnectionError> {
        match self {
            Self::Memory => SqliteConnectOptions::from_str("sqlite::memory:").map_err(|source| {
                ConnectionError::Open {
                    location: self.to_string(),
                    source,
                }
            }),
            Self::File(path) => Ok(SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)),
        }
    }

    fn ensure_parent_dir(&self) -> Result<(), ConnectionError> {
        let Self::File(path) = self else {
            return Ok(());
        };

        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                std::fs::create_dir_all(parent).map_err(|source| {
                    ConnectionError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    }
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(MEMORY),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&Path> for DatabaseLocation {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&StorageConfig> for PoolConfig {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            max_connections: storage.max_connections,
            ..Self::default()
        }
    }
}

pub async fn create_pool(
    location: &DatabaseLocation,
    config: &PoolConfig,
) -> Result<SqlitePool, ConnectionError> {
    location.ensure_parent_dir()?;
    let options = location.connect_options()?.busy_timeout(config.busy_timeout);

    // Every connection to `:memory:` is a separate database
    let pool_options = match location {
        DatabaseLocation::Memory => SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None),
        DatabaseLocation::File(_) => {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        }
    };

    pool_options
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|source| ConnectionError::Open {
            location: location.to_string(),
            source,
        })
}

pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    create_pool(&DatabaseLocation::Memory, &PoolConfig::default()).await
}
