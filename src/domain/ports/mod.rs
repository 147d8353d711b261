//! Port traits the core calls into.
//!
//! Adapters for these live under `adapters` and `infrastructure`.

pub mod image_generator;
pub mod image_resolver;
pub mod key_value_store;
pub mod scoring_client;
pub mod session_provider;

pub use image_generator::ImageGenerator;
pub use image_resolver::ImageResolver;
pub use key_value_store::KeyValueStore;
pub use scoring_client::ScoringClient;
pub use session_provider::SessionProvider;
