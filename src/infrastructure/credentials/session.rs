use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::error::{SessionError, StorageError};
use crate::domain::models::{Credentials, Session, User};
use crate::domain::ports::{KeyValueStore, SessionProvider};

/// Key holding the active session
pub const CURRENT_SESSION_KEY: &str = "current_session";

/// Key holding every user seen, by username
pub const KNOWN_USERS_KEY: &str = "known_users";

const MAX_USERNAME_LEN: usize = 64;

/// `SessionProvider` persisted in a `KeyValueStore`
///
/// A username maps to the same `User` (and id) across sessions.
pub struct StoredSessionProvider {
    storage: Arc<dyn KeyValueStore>,
}

impl StoredSessionProvider {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    async fn known_users(&self) -> Result<BTreeMap<String, User>, SessionError> {
        let Some(raw) = self.storage.get(KNOWN_USERS_KEY).await? else {
            return Ok(BTreeMap::new());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "stored users unreadable, starting fresh");
            BTreeMap::new()
        }))
    }
}

fn validate_username(username: &str) -> Result<&str, SessionError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(SessionError::InvalidCredentials(
            "username cannot be empty".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(SessionError::InvalidCredentials(format!(
            "username longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(SessionError::InvalidCredentials(format!(
            "username '{username}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }

    Ok(username)
}

#[async_trait]
impl SessionProvider for StoredSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(raw) = self.storage.get(CURRENT_SESSION_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "stored session unreadable, ignoring it");
                Ok(None)
            }
        }
    }

    async fn begin_session(&self, credentials: Credentials) -> Result<Session, SessionError> {
        let username = validate_username(&credentials.username)?;
        let mut users = self.known_users().await?;

        let mut user = users
            .get(username)
            .cloned()
            .unwrap_or_else(|| User::new(username));
        if let Some(display_name) = credentials.display_name.filter(|d| !d.trim().is_empty()) {
            user = user.with_display_name(display_name.trim());
        }
        users.insert(username.to_string(), user.clone());

        let session = Session::start(user);
        let users_raw = serde_json::to_string(&users).map_err(StorageError::from)?;
        let session_raw = serde_json::to_string(&session).map_err(StorageError::from)?;

        self.storage.put(KNOWN_USERS_KEY, &users_raw).await?;
        self.storage.put(CURRENT_SESSION_KEY, &session_raw).await?;

        debug!(username, user_id = %session.user.id, "session started");
        Ok(session)
    }

    async fn end_session(&self) -> Result<(), SessionError> {
        self.storage.remove(CURRENT_SESSION_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryKeyValueStore;

    fn provider() -> StoredSessionProvider {
        StoredSessionProvider::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn test_begin_and_end_session() {
        let provider = provider();
        assert!(provider.current_session().await.unwrap().is_none());

        let session = provider.begin_session(Credentials::new("ada")).await.unwrap();
        assert_eq!(session.user.username, "ada");
        assert_eq!(provider.current_session().await.unwrap(), Some(session));

        provider.end_session().await.unwrap();
        assert!(provider.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_username_keeps_id() {
        let provider = provider();

        let first = provider.begin_session(Credentials::new("ada")).await.unwrap();
        provider.end_session().await.unwrap();
        let second = provider
            .begin_session(Credentials {
                username: " ada ".to_string(),
                display_name: Some("Ada L.".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(second.user.label(), "Ada L.");
    }

    #[tokio::test]
    async fn test_rejects_bad_usernames() {
        let provider = provider();

        for bad in ["", "   ", "has space", "semi;colon"] {
            assert!(matches!(
                provider.begin_session(Credentials::new(bad)).await,
                Err(SessionError::InvalidCredentials(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_corrupt_session_reads_as_none() {
        let storage = Arc::new(InMemoryKeyValueStore::new());
        storage.put(CURRENT_SESSION_KEY, "garbage").await.unwrap();

        let provider = StoredSessionProvider::new(storage);
        assert!(provider.current_session().await.unwrap().is_none());
    }
}
