//! Common test utilities for integration tests
//!
//! Provides fake collaborators, image fixtures and a wired-up state machine
//! shared across integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use promptcraft::adapters::memory::InMemoryKeyValueStore;
use promptcraft::domain::error::{CompositorError, GenerationError, ScoringError, StorageError};
use promptcraft::domain::models::{
    AnalysisResult, Challenge, ChallengeCatalog, ChallengeId, CompositeFormat, CompositorConfig,
    EncodedImage, FetchedImage, ImageRef, ProgressionPolicy, User,
};
use promptcraft::domain::ports::{ImageGenerator, ImageResolver, KeyValueStore, ScoringClient};
use promptcraft::services::{
    ChallengeStateMachine, ImageCompositor, ProgressStore, SignalBus, DEFAULT_SIGNAL_CAPACITY,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Encode a solid-color PNG
pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png fixture");
    bytes
}

/// Three challenges `c1`, `c2`, `c3` in play order
pub fn catalog() -> ChallengeCatalog {
    ChallengeCatalog::new(
        ["c1", "c2", "c3"]
            .into_iter()
            .map(|id| {
                Challenge::new(
                    id,
                    format!("Challenge {id}"),
                    format!("Recreate target {id}"),
                    ImageRef::Path(PathBuf::from(format!("targets/{id}.png"))),
                )
            })
            .collect(),
    )
    .expect("valid catalog")
}

pub fn id(raw: &str) -> ChallengeId {
    ChallengeId::from(raw)
}

pub fn user() -> User {
    User::new("tester")
}

pub fn analysis(score: f64) -> Result<AnalysisResult, ScoringError> {
    AnalysisResult::new(score, vec!["add more contrast".to_string()])
}

/// Generator returning a small PNG, optionally waiting for a permit first
pub struct FakeGenerator {
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    failure: Mutex<Option<GenerationError>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: None,
            failure: Mutex::new(None),
        }
    }

    /// Each `generate` call waits for one permit on `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    /// The next call fails with `error`
    pub fn fail_next(&self, error: GenerationError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(
        &self,
        _challenge: &Challenge,
        _prompt: &str,
    ) -> Result<EncodedImage, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }

        Ok(EncodedImage::from_bytes("image/png", &png(4, 4, [200, 40, 40])))
    }
}

/// Resolver serving the same PNG for every target
pub struct FakeResolver {
    bytes: Vec<u8>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self {
            bytes: png(4, 4, [40, 40, 200]),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageResolver for FakeResolver {
    async fn fetch(&self, image: &ImageRef) -> Result<FetchedImage, CompositorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedImage::new(image.to_string(), self.bytes.clone()))
    }
}

/// Scorer replaying scripted results per challenge
///
/// Unscripted calls score 0.
pub struct ScriptedScorer {
    script: Mutex<HashMap<ChallengeId, VecDeque<Result<AnalysisResult, ScoringError>>>>,
    calls: AtomicUsize,
    last_media_type: Mutex<Option<String>>,
}

impl ScriptedScorer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            last_media_type: Mutex::new(None),
        }
    }

    pub fn push(&self, challenge_id: &str, result: Result<AnalysisResult, ScoringError>) {
        self.script
            .lock()
            .unwrap()
            .entry(ChallengeId::from(challenge_id))
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_media_type(&self) -> Option<String> {
        self.last_media_type.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoringClient for ScriptedScorer {
    async fn score(
        &self,
        _user: &User,
        challenge: &Challenge,
        composite: &EncodedImage,
        _user_prompt: &str,
    ) -> Result<AnalysisResult, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_media_type.lock().unwrap() = Some(composite.media_type.clone());

        self.script
            .lock()
            .unwrap()
            .get_mut(&challenge.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| AnalysisResult::new(0.0, vec![]))
    }
}

/// Store whose reads succeed and whose writes always fail
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: InMemoryKeyValueStore,
}

impl ReadOnlyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn put(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk full".to_string()))
    }
}

/// A state machine over fakes and a key-value store
pub struct Harness {
    pub machine: Arc<ChallengeStateMachine>,
    pub storage: Arc<dyn KeyValueStore>,
    pub generator: Arc<FakeGenerator>,
    pub resolver: Arc<FakeResolver>,
    pub scorer: Arc<ScriptedScorer>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_generator(FakeGenerator::new()).await
    }

    pub async fn with_generator(generator: FakeGenerator) -> Self {
        Self::build(Arc::new(InMemoryKeyValueStore::new()), generator).await
    }

    /// Wire a machine over `storage` and load its progress
    pub async fn build(storage: Arc<dyn KeyValueStore>, generator: FakeGenerator) -> Self {
        let harness = Self::uninitialized(storage, generator);
        harness
            .machine
            .initialize()
            .await
            .expect("initialize progress");
        harness
    }

    /// Wire a machine over `storage` without loading stored progress
    pub fn uninitialized(storage: Arc<dyn KeyValueStore>, generator: FakeGenerator) -> Self {
        let generator = Arc::new(generator);
        let resolver = Arc::new(FakeResolver::new());
        let scorer = Arc::new(ScriptedScorer::new());

        let compositor = ImageCompositor::new(
            resolver.clone(),
            CompositorConfig {
                format: CompositeFormat::Png,
                ..CompositorConfig::default()
            },
        );

        let machine = ChallengeStateMachine::new(
            catalog(),
            ProgressStore::new(storage.clone()),
            generator.clone(),
            Arc::new(compositor),
            scorer.clone(),
            Arc::new(SignalBus::new(DEFAULT_SIGNAL_CAPACITY)),
            ProgressionPolicy::default(),
        );
        Self {
            machine: Arc::new(machine),
            storage,
            generator,
            resolver,
            scorer,
        }
    }
}
