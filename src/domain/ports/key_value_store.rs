use async_trait::async_trait;

use crate::domain::error::StorageError;

/// Durable string key-value storage
///
/// Values are opaque strings (JSON in practice). A `put` on an existing
/// key replaces its value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key was never written or was removed
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
