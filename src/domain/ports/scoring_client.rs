use async_trait::async_trait;

use crate::domain::error::ScoringError;
use crate::domain::models::{AnalysisResult, Challenge, EncodedImage, User};

/// Scoring oracle boundary
///
/// Sends one composite image plus challenge and user context to an external
/// oracle and returns a validated result.
///
/// Implementations must:
/// - never retry automatically
/// - return either a fully validated `AnalysisResult` or an error, nothing partial
#[async_trait]
pub trait ScoringClient: Send + Sync {
    /// Score a composite (target left, candidate right) for a challenge
    ///
    /// # Errors
    /// - `ScoringError::Transport` if the oracle is unreachable
    /// - `ScoringError::MalformedResponse` if the output violates the schema
    /// - `ScoringError::Unknown` for anything else the dependency surfaces
    async fn score(
        &self,
        user: &User,
        challenge: &Challenge,
        composite: &EncodedImage,
        user_prompt: &str,
    ) -> Result<AnalysisResult, ScoringError>;
}
