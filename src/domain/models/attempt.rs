//! Attempt lifecycle model.
//!
//! An attempt is one prompt submission against a challenge. It moves
//! through `Idle -> AwaitingGeneration -> Analyzing -> Scored -> Idle` and
//! ends either scored (the oracle returned a validated result) or failed
//! (generation, compositing or scoring broke down).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::analysis::AnalysisResult;
use super::challenge::ChallengeId;
use super::progress::ChallengeProgress;
use crate::domain::error::PipelineError;

/// Default minimum similarity score that counts as a pass.
pub const DEFAULT_PASS_THRESHOLD: f64 = 70.0;

/// Phase of the attempt currently running for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Idle,
    AwaitingGeneration,
    Analyzing,
    Scored,
}

impl AttemptPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingGeneration => "awaiting_generation",
            Self::Analyzing => "analyzing",
            Self::Scored => "scored",
        }
    }

    /// Whether an attempt in this phase blocks new submissions.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::AwaitingGeneration | Self::Analyzing)
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction the streak moved on a scored transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakChange {
    Increase,
    Decrease,
    None,
}

impl StreakChange {
    pub fn between(previous: u32, current: u32) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Self::Increase,
            std::cmp::Ordering::Less => Self::Decrease,
            std::cmp::Ordering::Equal => Self::None,
        }
    }
}

/// Pass/fail policy applied to every scored attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressionPolicy {
    pub pass_threshold: f64,
}

impl ProgressionPolicy {
    pub fn new(pass_threshold: f64) -> Self {
        Self { pass_threshold }
    }

    pub fn is_pass(&self, similarity_score: f64) -> bool {
        similarity_score >= self.pass_threshold
    }
}

impl Default for ProgressionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_THRESHOLD)
    }
}

/// Outcome of a scored attempt after it has been applied to progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptReport {
    pub challenge_id: ChallengeId,
    pub result: AnalysisResult,
    pub passed: bool,
    pub streak_change: StreakChange,

    /// Progress of the challenge after the attempt was applied
    pub progress: ChallengeProgress,

    /// Next challenge unlocked by this attempt, if any
    pub unlocked: Option<ChallengeId>,

    /// Whether this attempt was the first pass of the challenge
    pub completed_now: bool,
}

/// An attempt that never produced a score.
#[derive(Debug)]
pub struct AttemptFailure {
    pub challenge_id: ChallengeId,
    pub error: PipelineError,
}

/// Terminal state of an attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Scored(AttemptReport),
    Failed(AttemptFailure),
}

impl AttemptOutcome {
    pub fn challenge_id(&self) -> &ChallengeId {
        match self {
            Self::Scored(report) => &report.challenge_id,
            Self::Failed(failure) => &failure.challenge_id,
        }
    }

    pub fn report(&self) -> Option<&AttemptReport> {
        match self {
            Self::Scored(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&AttemptFailure> {
        match self {
            Self::Scored(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn streak_change(&self) -> StreakChange {
        self.report()
            .map_or(StreakChange::None, |report| report.streak_change)
    }
}
