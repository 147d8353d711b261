//! Domain layer for the Promptcraft challenge client
//!
//! This module contains core models, error taxonomy and port traits.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{
    AttemptError, CatalogError, CompositorError, GenerationError, PipelineError, ProgressError,
    ScoringError, SessionError, StorageError,
};
