//! Composition root for CLI commands
//!
//! Wires configuration into concrete adapters. Collaborators that need API
//! keys are only built for commands that submit attempts.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::generation::OpenAiImageGenerator;
use crate::adapters::images::DefaultImageResolver;
use crate::adapters::sqlite::{
    initialize_database, DatabaseLocation, PoolConfig, SqliteKeyValueStore,
};
use crate::domain::models::{ChallengeCatalog, Config, ProgressionPolicy, Session};
use crate::domain::ports::{KeyValueStore, SessionProvider};
use crate::infrastructure::claude::{ClaudeClient, ClaudeClientConfig, ClaudeScoringClient};
use crate::infrastructure::credentials::StoredSessionProvider;
use crate::services::{
    ChallengeStateMachine, ImageCompositor, ProgressStore, SignalBus, DEFAULT_SIGNAL_CAPACITY,
};

/// Shared state for one CLI invocation
pub struct AppContext {
    pub config: Config,
    pub catalog: ChallengeCatalog,
    storage: Arc<dyn KeyValueStore>,
    sessions: StoredSessionProvider,
}

impl AppContext {
    /// Open (and migrate) the configured database
    pub async fn open(config: Config) -> Result<Self> {
        let catalog =
            ChallengeCatalog::new(config.catalog.clone()).context("Invalid challenge catalog")?;

        let pool = initialize_database(
            &DatabaseLocation::parse(&config.storage.path),
            &PoolConfig::from(&config.storage),
        )
        .await
        .with_context(|| format!("Failed to open database at {}", config.storage.path))?;

        Ok(Self::with_storage(config, catalog, Arc::new(SqliteKeyValueStore::new(pool))))
    }

    /// Build a context over an existing store
    pub fn with_storage(
        config: Config,
        catalog: ChallengeCatalog,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let sessions = StoredSessionProvider::new(Arc::clone(&storage));
        Self {
            config,
            catalog,
            storage,
            sessions,
        }
    }

    pub fn progress_store(&self) -> ProgressStore {
        ProgressStore::new(Arc::clone(&self.storage))
    }

    pub fn sessions(&self) -> &StoredSessionProvider {
        &self.sessions
    }

    /// The active session, or an error telling the user how to start one
    pub async fn require_session(&self) -> Result<Session> {
        self.sessions
            .current_session()
            .await
            .context("Failed to read session")?
            .context("Not signed in. Run `promptcraft session login <USERNAME>` first")
    }

    /// Build the attempt pipeline with live generation and scoring clients
    pub async fn state_machine(&self) -> Result<Arc<ChallengeStateMachine>> {
        let generator = OpenAiImageGenerator::new(self.config.generation.clone())
            .context("Failed to create image generation client")?;

        let resolver = DefaultImageResolver::with_timeout(Duration::from_secs(
            self.config.generation.timeout_secs,
        ))
        .context("Failed to create image resolver")?;
        let compositor = ImageCompositor::new(Arc::new(resolver), self.config.compositor.clone());

        let claude_config = ClaudeClientConfig::from_scoring(&self.config.scoring)
            .context("Failed to configure scoring client")?;
        let claude = ClaudeClient::new(claude_config).context("Failed to create scoring client")?;
        let scorer = ClaudeScoringClient::new(claude, &self.config.scoring);

        let machine = ChallengeStateMachine::new(
            self.catalog.clone(),
            self.progress_store(),
            Arc::new(generator),
            Arc::new(compositor),
            Arc::new(scorer),
            Arc::new(SignalBus::new(DEFAULT_SIGNAL_CAPACITY)),
            ProgressionPolicy::new(self.config.scoring.pass_threshold),
        );
        machine
            .initialize()
            .await
            .context("Failed to load challenge progress")?;

        Ok(Arc::new(machine))
    }
}
