//! SignalBus for transient attempt signals.
//!
//! Audio cues and UI indicators subscribe here. Signals are push-only and
//! never persisted; emitting with no subscribers is a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::domain::models::{AttemptPhase, ChallengeId, StreakChange};

/// Default broadcast channel capacity.
pub const DEFAULT_SIGNAL_CAPACITY: usize = 64;

/// What happened during an attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    AttemptStarted,
    PhaseChanged {
        phase: AttemptPhase,
    },
    /// Emitted on every scored transition, including `StreakChange::None`
    StreakChanged {
        change: StreakChange,
        streak: u32,
    },
    /// `passed` and `similarity_score` are `None` when the pipeline failed
    AttemptFinished {
        passed: Option<bool>,
        similarity_score: Option<f64>,
    },
}

/// A sequenced signal for one challenge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptSignal {
    pub sequence: u64,
    pub challenge_id: ChallengeId,
    pub timestamp: DateTime<Utc>,
    pub kind: SignalKind,
}

/// Broadcast bus for attempt signals.
pub struct SignalBus {
    sender: broadcast::Sender<AttemptSignal>,
    sequence: AtomicU64,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Emit a signal for `challenge_id`.
    pub fn emit(&self, challenge_id: &ChallengeId, kind: SignalKind) {
        let signal = AttemptSignal {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            challenge_id: challenge_id.clone(),
            timestamp: Utc::now(),
            kind,
        };

        // No receivers is fine
        let _ = self.sender.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttemptSignal> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNAL_CAPACITY)
    }
}
