//! In-memory adapters for tests and ephemeral sessions.

pub mod key_value_store;

pub use key_value_store::InMemoryKeyValueStore;
