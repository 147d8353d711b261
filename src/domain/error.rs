use thiserror::Error;

use super::models::challenge::ChallengeId;

/// Errors raised while building the side-by-side comparison image
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Failed to load image '{source_label}': {reason}")]
    ImageLoad { source_label: String, reason: String },

    #[error("Failed to render composite: {0}")]
    Render(String),
}

impl CompositorError {
    pub fn image_load(source_label: impl Into<String>, reason: impl ToString) -> Self {
        Self::ImageLoad {
            source_label: source_label.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by the scoring oracle boundary
#[derive(Error, Debug)]
pub enum ScoringError {
    /// The oracle could not be reached or is temporarily unavailable
    #[error("Scoring oracle unreachable: {0}")]
    Transport(String),

    /// The oracle answered, but not with the expected schema
    #[error("Malformed scoring response: {0}")]
    MalformedResponse(String),

    /// Anything else surfaced by the dependency
    #[error("Scoring failed while {context}: {source}")]
    Unknown {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ScoringError {
    pub fn unknown(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unknown {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns true if a later retry by the caller could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors raised by the image generation collaborator
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Image generation service unreachable: {0}")]
    Transport(String),

    #[error("Image generation rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed image generation response: {0}")]
    MalformedResponse(String),

    #[error("Image generation API key not configured")]
    MissingApiKey,
}

impl GenerationError {
    /// Returns true if this error is transient and may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) | Self::MissingApiKey => false,
        }
    }
}

/// Errors from the durable key-value store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the progress store
#[derive(Error, Debug)]
pub enum ProgressError {
    /// Stored progress could not be parsed; recovered by resetting to defaults
    #[error("Stored progress is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Refusing to persist an empty progress map")]
    EmptyProgressMap,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the session collaborator
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors building the challenge catalog
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Challenge catalog cannot be empty")]
    Empty,

    #[error("Challenge at position {0} has a blank id")]
    BlankId(usize),

    #[error("Duplicate challenge id: {0}")]
    DuplicateId(ChallengeId),
}

/// A failure in the generate -> compose -> score pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Compositing failed: {0}")]
    Compositor(#[from] CompositorError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),
}

impl PipelineError {
    /// Pipeline stage the error came from
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Generation(_) => "generation",
            Self::Compositor(_) => "compositing",
            Self::Scoring(_) => "scoring",
        }
    }
}

/// Errors rejecting or finalizing an attempt
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("Challenge {0} is locked")]
    ChallengeLocked(ChallengeId),

    #[error("An attempt on challenge {0} is already in progress")]
    AttemptInProgress(ChallengeId),

    #[error("Unknown challenge: {0}")]
    UnknownChallenge(ChallengeId),

    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    /// Stored progress has not been loaded for this session
    #[error("Progress has not been loaded; call initialize first")]
    NotInitialized,

    #[error("Failed to persist attempt result: {0}")]
    Persistence(#[from] ProgressError),
}
