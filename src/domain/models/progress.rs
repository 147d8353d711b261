//! Per-challenge progress records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::challenge::ChallengeId;

/// Access status of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Not yet reachable
    Locked,
    /// Playable, not yet passed
    Unlocked,
    /// Passed at least once; still playable
    Completed,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Completed => "completed",
        }
    }

    /// Whether attempts may be submitted.
    pub fn is_playable(&self) -> bool {
        !matches!(self, Self::Locked)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable progress for one challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub status: ChallengeStatus,

    /// Consecutive passing attempts since the last failure
    pub streak: u32,

    /// Similarity score (0-100) of the most recent scored attempt
    pub previous_similarity_score: f64,
}

impl ChallengeProgress {
    pub fn locked() -> Self {
        Self::with_status(ChallengeStatus::Locked)
    }

    pub fn unlocked() -> Self {
        Self::with_status(ChallengeStatus::Unlocked)
    }

    pub fn with_status(status: ChallengeStatus) -> Self {
        Self {
            status,
            streak: 0,
            previous_similarity_score: 0.0,
        }
    }
}

/// Progress for every challenge, keyed by id.
pub type ProgressMap = BTreeMap<ChallengeId, ChallengeProgress>;
