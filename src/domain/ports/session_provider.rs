use async_trait::async_trait;

use crate::domain::error::SessionError;
use crate::domain::models::{Credentials, Session};

/// Credential and session collaborator
///
/// The core only reads the `User` of the current session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, SessionError>;

    /// Start a session, replacing any existing one
    async fn begin_session(&self, credentials: Credentials) -> Result<Session, SessionError>;

    async fn end_session(&self) -> Result<(), SessionError>;
}
