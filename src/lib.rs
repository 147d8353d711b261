//! Promptcraft - prompt engineering challenges scored by an image oracle
//!
//! A player picks a challenge, writes an image generation prompt, and the
//! generated image is placed next to the challenge's target image. A vision
//! model scores how closely the two match; passing scores build a streak and
//! unlock the next challenge in the catalog.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, error taxonomy and ports
//! - **Service Layer** (`services`): Compositing, progress persistence,
//!   the attempt state machine and the signal bus
//! - **Adapters** (`adapters`): SQLite and in-memory storage, image
//!   generation and image fetching
//! - **Infrastructure Layer** (`infrastructure`): Claude scoring client,
//!   configuration, logging and sessions
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use promptcraft::{ChallengeStateMachine, ChallengeId};
//!
//! let outcome = machine.submit(&user, &ChallengeId::from("lighthouse"), "a lighthouse at dusk").await?;
//! if let Some(report) = outcome.report() {
//!     println!("{} -> streak {}", report.result.similarity_score, report.progress.streak);
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{
    AttemptError, CompositorError, GenerationError, PipelineError, ProgressError, ScoringError,
};
pub use domain::models::{
    AnalysisResult, AttemptOutcome, AttemptReport, Challenge, ChallengeCatalog, ChallengeId,
    ChallengeProgress, ChallengeStatus, Config, EncodedImage, ImageRef, ProgressMap,
    ProgressionPolicy, StreakChange, User,
};
pub use domain::ports::{ImageGenerator, ImageResolver, KeyValueStore, ScoringClient, SessionProvider};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ChallengeStateMachine, ImageCompositor, ProgressStore, SignalBus};
