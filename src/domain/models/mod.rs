//! Domain models for the challenge client.

pub mod analysis;
pub mod attempt;
pub mod challenge;
pub mod config;
pub mod image;
pub mod progress;
pub mod session;

pub use analysis::{AnalysisResult, MAX_FEEDBACK_ITEMS};
pub use attempt::{
    AttemptFailure, AttemptOutcome, AttemptPhase, AttemptReport, ProgressionPolicy,
    StreakChange, DEFAULT_PASS_THRESHOLD,
};
pub use challenge::{Challenge, ChallengeCatalog, ChallengeId};
pub use config::{
    CompositeFormat, CompositorConfig, Config, GenerationConfig, LoggingConfig, ScoringConfig,
    StorageConfig,
};
pub use image::{EncodedImage, FetchedImage, ImageRef};
pub use progress::{ChallengeProgress, ChallengeStatus, ProgressMap};
pub use session::{Credentials, Session, User};
