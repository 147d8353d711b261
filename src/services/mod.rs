//! Application services for the challenge client.

pub mod challenge_state_machine;
pub mod image_compositor;
pub mod progress_store;
pub mod signal_bus;

pub use challenge_state_machine::{apply_score, ChallengeStateMachine, ScoreTransition};
pub use image_compositor::{compose_images, ImageCompositor};
pub use progress_store::{ProgressStore, PROGRESS_STORAGE_KEY};
pub use signal_bus::{AttemptSignal, SignalBus, SignalKind, DEFAULT_SIGNAL_CAPACITY};
