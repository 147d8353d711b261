//! Image resolution adapters.

pub mod resolver;

pub use resolver::DefaultImageResolver;
