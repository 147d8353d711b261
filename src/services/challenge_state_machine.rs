//! Challenge attempt state machine.
//!
//! Drives one attempt per challenge through
//! `Idle -> AwaitingGeneration -> Analyzing -> Scored -> Idle`, applies the
//! scored result to progress and persists it.
//!
//! Concurrency model:
//! - the in-flight registry allows one attempt per challenge; its lock is
//!   never held across an await
//! - all progress writes are serialized by `write_gate`, held across
//!   apply and save
//! - the in-memory map is replaced only after a successful save
//! - attempts are rejected until stored progress has been loaded, so a
//!   default map never overwrites what is on disk

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::image_compositor::ImageCompositor;
use super::progress_store::ProgressStore;
use super::signal_bus::{SignalBus, SignalKind};
use crate::domain::error::{AttemptError, PipelineError, ProgressError};
use crate::domain::models::{
    AnalysisResult, AttemptFailure, AttemptOutcome, AttemptPhase, AttemptReport, Challenge,
    ChallengeCatalog, ChallengeId, ChallengeProgress, ChallengeStatus, ProgressMap,
    ProgressionPolicy, StreakChange, User,
};
use crate::domain::ports::{ImageGenerator, ScoringClient};

type InFlightRegistry = Arc<Mutex<HashMap<ChallengeId, AttemptPhase>>>;

/// Marks a challenge as having an attempt in flight.
///
/// The entry is removed on drop, so a finished, failed or panicked attempt
/// always frees its challenge.
struct InFlightGuard {
    registry: InFlightRegistry,
    challenge_id: ChallengeId,
}

impl InFlightGuard {
    fn acquire(registry: &InFlightRegistry, challenge_id: &ChallengeId) -> Option<Self> {
        let mut in_flight = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.contains_key(challenge_id) {
            return None;
        }
        in_flight.insert(challenge_id.clone(), AttemptPhase::AwaitingGeneration);

        Some(Self {
            registry: Arc::clone(registry),
            challenge_id: challenge_id.clone(),
        })
    }

    fn set_phase(&self, phase: AttemptPhase) {
        let mut in_flight = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.insert(self.challenge_id.clone(), phase);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.remove(&self.challenge_id);
    }
}

/// Effect of one scored attempt on the progress map.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTransition {
    pub progress: ProgressMap,
    pub record: ChallengeProgress,
    pub passed: bool,
    pub streak_change: StreakChange,
    pub unlocked: Option<ChallengeId>,
    pub completed_now: bool,
}

/// Apply a similarity score to a copy of `progress`.
///
/// On pass the streak increments and, if the challenge is the furthest
/// reached one, the next Locked challenge unlocks. On fail the streak
/// resets. The score is recorded either way; Completed never regresses.
///
/// The furthest reached challenge is the highest-indexed playable one.
/// Loading and merging keep playable challenges a prefix of the catalog,
/// so this is also the last challenge that is Unlocked or Completed, and
/// the one right after it is the only Locked challenge a pass can open.
pub fn apply_score(
    progress: &ProgressMap,
    catalog: &ChallengeCatalog,
    challenge_id: &ChallengeId,
    similarity_score: f64,
    policy: &ProgressionPolicy,
) -> ScoreTransition {
    let mut next = progress.clone();
    let passed = policy.is_pass(similarity_score);

    // Frontier is measured before this attempt changes anything
    let frontier = catalog
        .iter()
        .enumerate()
        .filter(|(_, c)| progress.get(&c.id).is_some_and(|p| p.status.is_playable()))
        .map(|(index, _)| index)
        .last();

    let record = next
        .entry(challenge_id.clone())
        .or_insert_with(ChallengeProgress::unlocked);
    let previous_streak = record.streak;

    record.previous_similarity_score = similarity_score;
    record.streak = if passed {
        previous_streak.saturating_add(1)
    } else {
        0
    };

    let completed_now = passed && record.status == ChallengeStatus::Unlocked;
    if completed_now {
        record.status = ChallengeStatus::Completed;
    }
    let record = record.clone();

    let mut unlocked = None;
    if passed {
        let index = catalog.index_of(challenge_id);
        if index.is_some() && index == frontier {
            if let Some(successor) = index.and_then(|i| catalog.get_index(i + 1)) {
                if let Some(entry) = next.get_mut(&successor.id) {
                    if entry.status == ChallengeStatus::Locked {
                        entry.status = ChallengeStatus::Unlocked;
                        unlocked = Some(successor.id.clone());
                    }
                }
            }
        }
    }

    ScoreTransition {
        streak_change: StreakChange::between(previous_streak, record.streak),
        progress: next,
        record,
        passed,
        unlocked,
        completed_now,
    }
}

pub struct ChallengeStateMachine {
    catalog: ChallengeCatalog,
    store: ProgressStore,
    generator: Arc<dyn ImageGenerator>,
    compositor: Arc<ImageCompositor>,
    scorer: Arc<dyn ScoringClient>,
    signals: Arc<SignalBus>,
    policy: ProgressionPolicy,
    progress: RwLock<ProgressMap>,
    initialized: AtomicBool,
    write_gate: tokio::sync::Mutex<()>,
    in_flight: InFlightRegistry,
}

impl ChallengeStateMachine {
    /// Create a state machine seeded with default progress.
    ///
    /// Call [`initialize`](Self::initialize) once per session to load what
    /// is stored; attempts fail with `NotInitialized` until then.
    pub fn new(
        catalog: ChallengeCatalog,
        store: ProgressStore,
        generator: Arc<dyn ImageGenerator>,
        compositor: Arc<ImageCompositor>,
        scorer: Arc<dyn ScoringClient>,
        signals: Arc<SignalBus>,
        policy: ProgressionPolicy,
    ) -> Self {
        let progress = ProgressStore::initialize_defaults(&catalog);
        Self {
            catalog,
            store,
            generator,
            compositor,
            scorer,
            signals,
            policy,
            progress: RwLock::new(progress),
            initialized: AtomicBool::new(false),
            write_gate: tokio::sync::Mutex::new(()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load stored progress, reconciled with the catalog.
    pub async fn initialize(&self) -> Result<ProgressMap, ProgressError> {
        let _gate = self.write_gate.lock().await;
        let loaded = self.store.load(&self.catalog).await?;
        *self.progress.write().unwrap_or_else(PoisonError::into_inner) = loaded.clone();
        self.initialized.store(true, Ordering::Release);
        Ok(loaded)
    }

    pub fn catalog(&self) -> &ChallengeCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &ProgressionPolicy {
        &self.policy
    }

    pub fn signals(&self) -> &Arc<SignalBus> {
        &self.signals
    }

    /// Snapshot of current progress.
    pub fn progress(&self) -> ProgressMap {
        self.read_progress().clone()
    }

    /// Phase of the attempt running for `challenge_id`, `Idle` if none.
    pub fn phase(&self, challenge_id: &ChallengeId) -> AttemptPhase {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(challenge_id)
            .copied()
            .unwrap_or(AttemptPhase::Idle)
    }

    /// Run one attempt to completion.
    ///
    /// Guard conditions are checked before any asynchronous work starts.
    /// Pipeline failures resolve to `AttemptOutcome::Failed` and leave
    /// progress untouched. A failed save returns `Persistence` after the
    /// attempt's closing signals, with in-memory progress unchanged.
    pub async fn submit(
        &self,
        user: &User,
        challenge_id: &ChallengeId,
        prompt: &str,
    ) -> Result<AttemptOutcome, AttemptError> {
        let (challenge, guard) = self.begin(challenge_id, prompt)?;
        self.run(user, challenge, prompt, guard).await
    }

    /// Check guard conditions now and run the attempt in the background.
    pub fn spawn_submit(
        self: &Arc<Self>,
        user: User,
        challenge_id: ChallengeId,
        prompt: String,
    ) -> Result<JoinHandle<Result<AttemptOutcome, AttemptError>>, AttemptError> {
        let (challenge, guard) = self.begin(&challenge_id, &prompt)?;
        let this = Arc::clone(self);

        Ok(tokio::spawn(async move {
            this.run(&user, challenge, &prompt, guard).await
        }))
    }

    /// Replace stored progress with defaults.
    pub async fn reset_progress(&self) -> Result<ProgressMap, ProgressError> {
        let _gate = self.write_gate.lock().await;
        let defaults = self.store.reset(&self.catalog).await?;
        *self.progress.write().unwrap_or_else(PoisonError::into_inner) = defaults.clone();
        self.initialized.store(true, Ordering::Release);
        info!("progress reset to defaults");
        Ok(defaults)
    }

    fn begin(
        &self,
        challenge_id: &ChallengeId,
        prompt: &str,
    ) -> Result<(Challenge, InFlightGuard), AttemptError> {
        if prompt.trim().is_empty() {
            return Err(AttemptError::EmptyPrompt);
        }

        if !self.initialized.load(Ordering::Acquire) {
            warn!(%challenge_id, "rejected attempt before progress was loaded");
            return Err(AttemptError::NotInitialized);
        }

        let challenge = self
            .catalog
            .get(challenge_id)
            .cloned()
            .ok_or_else(|| AttemptError::UnknownChallenge(challenge_id.clone()))?;

        let playable = self
            .read_progress()
            .get(challenge_id)
            .is_some_and(|p| p.status.is_playable());
        if !playable {
            debug!(%challenge_id, "rejected attempt on locked challenge");
            return Err(AttemptError::ChallengeLocked(challenge_id.clone()));
        }

        let guard = InFlightGuard::acquire(&self.in_flight, challenge_id).ok_or_else(|| {
            debug!(%challenge_id, "rejected concurrent attempt");
            AttemptError::AttemptInProgress(challenge_id.clone())
        })?;

        Ok((challenge, guard))
    }

    #[instrument(
        name = "attempt",
        skip(self, user, challenge, prompt, guard),
        fields(challenge_id = %challenge.id, user = %user.username)
    )]
    async fn run(
        &self,
        user: &User,
        challenge: Challenge,
        prompt: &str,
        guard: InFlightGuard,
    ) -> Result<AttemptOutcome, AttemptError> {
        info!("attempt started");
        self.signals.emit(&challenge.id, SignalKind::AttemptStarted);
        self.signal_phase(&challenge.id, AttemptPhase::AwaitingGeneration);

        let result = self.run_pipeline(user, &challenge, prompt, &guard).await;

        guard.set_phase(AttemptPhase::Scored);
        self.signal_phase(&challenge.id, AttemptPhase::Scored);

        let outcome = match result {
            Ok(result) => self
                .record(&challenge.id, result)
                .await
                .map(AttemptOutcome::Scored)
                .map_err(|error| {
                    warn!(error = %error, "attempt scored but not saved");
                    self.signal_unscored(&challenge.id);
                    error
                }),
            Err(error) => {
                warn!(stage = error.stage(), error = %error, "attempt failed");
                self.signal_unscored(&challenge.id);
                Ok(AttemptOutcome::Failed(AttemptFailure {
                    challenge_id: challenge.id.clone(),
                    error,
                }))
            }
        };

        drop(guard);
        self.signal_phase(&challenge.id, AttemptPhase::Idle);
        outcome
    }

    /// Close out an attempt that changed no progress.
    fn signal_unscored(&self, challenge_id: &ChallengeId) {
        let streak = self
            .read_progress()
            .get(challenge_id)
            .map_or(0, |p| p.streak);
        self.signals.emit(
            challenge_id,
            SignalKind::StreakChanged {
                change: StreakChange::None,
                streak,
            },
        );
        self.signals.emit(
            challenge_id,
            SignalKind::AttemptFinished {
                passed: None,
                similarity_score: None,
            },
        );
    }

    async fn run_pipeline(
        &self,
        user: &User,
        challenge: &Challenge,
        prompt: &str,
        guard: &InFlightGuard,
    ) -> Result<AnalysisResult, PipelineError> {
        let candidate = self.generator.generate(challenge, prompt).await?;

        guard.set_phase(AttemptPhase::Analyzing);
        self.signal_phase(&challenge.id, AttemptPhase::Analyzing);

        let composite = self
            .compositor
            .compose(&challenge.target_image, &candidate)
            .await?;
        drop(candidate);

        Ok(self.scorer.score(user, challenge, &composite, prompt).await?)
    }

    async fn record(
        &self,
        challenge_id: &ChallengeId,
        result: AnalysisResult,
    ) -> Result<AttemptReport, AttemptError> {
        let transition = {
            let _gate = self.write_gate.lock().await;
            let snapshot = self.progress();
            let transition = apply_score(
                &snapshot,
                &self.catalog,
                challenge_id,
                result.similarity_score,
                &self.policy,
            );

            self.store.save(&transition.progress).await?;
            *self.progress.write().unwrap_or_else(PoisonError::into_inner) =
                transition.progress.clone();
            transition
        };

        info!(
            score = result.similarity_score,
            passed = transition.passed,
            streak = transition.record.streak,
            unlocked = transition.unlocked.as_ref().map(ChallengeId::as_str),
            "attempt scored"
        );

        self.signals.emit(
            challenge_id,
            SignalKind::StreakChanged {
                change: transition.streak_change,
                streak: transition.record.streak,
            },
        );
        self.signals.emit(
            challenge_id,
            SignalKind::AttemptFinished {
                passed: Some(transition.passed),
                similarity_score: Some(result.similarity_score),
            },
        );

        Ok(AttemptReport {
            challenge_id: challenge_id.clone(),
            result,
            passed: transition.passed,
            streak_change: transition.streak_change,
            progress: transition.record,
            unlocked: transition.unlocked,
            completed_now: transition.completed_now,
        })
    }

    fn signal_phase(&self, challenge_id: &ChallengeId, phase: AttemptPhase) {
        debug!(%challenge_id, %phase, "phase changed");
        self.signals
            .emit(challenge_id, SignalKind::PhaseChanged { phase });
    }

    fn read_progress(&self) -> RwLockReadGuard<'_, ProgressMap> {
        self.progress.read().unwrap_or_else(PoisonError::into_inner)
    }
}
