//! Credential and session storage
//!
//! Sessions identify who is playing and are persisted through the
//! key-value store, so they survive between CLI invocations.

pub mod session;

pub use session::{StoredSessionProvider, CURRENT_SESSION_KEY, KNOWN_USERS_KEY};
