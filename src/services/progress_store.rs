//! Durable per-challenge progress.
//!
//! The whole `ProgressMap` is stored as one JSON document under
//! [`PROGRESS_STORAGE_KEY`]. This service never decides game logic; it
//! loads, reconciles with the catalog, and persists what it is given.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::error::{ProgressError, StorageError};
use crate::domain::models::{ChallengeCatalog, ChallengeProgress, ChallengeStatus, ProgressMap};
use crate::domain::ports::KeyValueStore;

/// Storage key holding the serialized progress map.
pub const PROGRESS_STORAGE_KEY: &str = "challenge_progress";

pub struct ProgressStore {
    storage: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Fresh progress: the first challenge Unlocked, every other Locked,
    /// all counters zeroed.
    pub fn initialize_defaults(catalog: &ChallengeCatalog) -> ProgressMap {
        catalog
            .iter()
            .enumerate()
            .map(|(index, challenge)| {
                let progress = if index == 0 {
                    ChallengeProgress::unlocked()
                } else {
                    ChallengeProgress::locked()
                };
                (challenge.id.clone(), progress)
            })
            .collect()
    }

    /// Reconcile stored progress with the current catalog.
    ///
    /// - entries for ids no longer in the catalog are dropped
    /// - catalog entries without a record start Locked
    /// - the first challenge is never Locked
    /// - if the furthest reached challenge is Completed, its successor is
    ///   Unlocked (covers challenges appended to the catalog later)
    pub fn merge_with_catalog(mut stored: ProgressMap, catalog: &ChallengeCatalog) -> ProgressMap {
        let mut merged: ProgressMap = catalog
            .iter()
            .map(|challenge| {
                let progress = stored
                    .remove(&challenge.id)
                    .unwrap_or_else(ChallengeProgress::locked);
                (challenge.id.clone(), progress)
            })
            .collect();

        if !stored.is_empty() {
            debug!(dropped = stored.len(), "dropped progress for unknown challenges");
        }

        if let Some(first) = merged.get_mut(&catalog.first().id) {
            if first.status == ChallengeStatus::Locked {
                first.status = ChallengeStatus::Unlocked;
            }
        }

        let frontier = catalog
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                merged
                    .get(&c.id)
                    .is_some_and(|p| p.status.is_playable())
            })
            .map(|(index, _)| index)
            .last();

        if let Some(index) = frontier {
            let frontier_completed = catalog
                .get_index(index)
                .and_then(|c| merged.get(&c.id))
                .is_some_and(|p| p.status == ChallengeStatus::Completed);

            if frontier_completed {
                if let Some(next) = catalog
                    .get_index(index + 1)
                    .and_then(|c| merged.get_mut(&c.id))
                {
                    if next.status == ChallengeStatus::Locked {
                        next.status = ChallengeStatus::Unlocked;
                    }
                }
            }
        }

        merged
    }

    /// Load progress, falling back to defaults when nothing usable is stored.
    ///
    /// Corrupt stored data is logged and replaced by defaults. Backend
    /// failures propagate.
    #[instrument(skip(self, catalog), fields(challenges = catalog.len()))]
    pub async fn load(&self, catalog: &ChallengeCatalog) -> Result<ProgressMap, ProgressError> {
        let Some(raw) = self.storage.get(PROGRESS_STORAGE_KEY).await? else {
            debug!("no stored progress, using defaults");
            return Ok(Self::initialize_defaults(catalog));
        };

        match Self::parse(&raw) {
            Ok(stored) => Ok(Self::merge_with_catalog(stored, catalog)),
            Err(err) => {
                warn!(error = %err, "stored progress unreadable, resetting to defaults");
                Ok(Self::initialize_defaults(catalog))
            }
        }
    }

    /// Persist the full progress map, replacing what was stored.
    pub async fn save(&self, progress: &ProgressMap) -> Result<(), ProgressError> {
        if progress.is_empty() {
            return Err(ProgressError::EmptyProgressMap);
        }

        let raw = serde_json::to_string(progress).map_err(StorageError::from)?;
        self.storage.put(PROGRESS_STORAGE_KEY, &raw).await?;
        debug!(entries = progress.len(), "progress saved");
        Ok(())
    }

    /// Overwrite stored progress with defaults and return them.
    pub async fn reset(&self, catalog: &ChallengeCatalog) -> Result<ProgressMap, ProgressError> {
        let defaults = Self::initialize_defaults(catalog);
        self.save(&defaults).await?;
        Ok(defaults)
    }

    fn parse(raw: &str) -> Result<ProgressMap, ProgressError> {
        serde_json::from_str(raw).map_err(|e| ProgressError::StorageCorrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryKeyValueStore;
    use crate::domain::models::{Challenge, ChallengeId, ImageRef};

    fn catalog(ids: &[&str]) -> ChallengeCatalog {
        ChallengeCatalog::new(
            ids.iter()
                .map(|id| Challenge::new(*id, *id, "goal", ImageRef::Path(format!("{id}.png").into())))
                .collect(),
        )
        .unwrap()
    }

    fn status(map: &ProgressMap, id: &str) -> ChallengeStatus {
        map[&ChallengeId::from(id)].status
    }

    #[test]
    fn test_initialize_defaults() {
        let map = ProgressStore::initialize_defaults(&catalog(&["a", "b", "c"]));

        assert_eq!(map.len(), 3);
        assert_eq!(status(&map, "a"), ChallengeStatus::Unlocked);
        assert_eq!(status(&map, "b"), ChallengeStatus::Locked);
        assert_eq!(status(&map, "c"), ChallengeStatus::Locked);
        assert!(map.values().all(|p| p.streak == 0 && p.previous_similarity_score == 0.0));
    }

    #[test]
    fn test_merge_drops_unknown_and_adds_missing() {
        let mut stored = ProgressMap::new();
        stored.insert("a".into(), ChallengeProgress::unlocked());
        stored.insert("gone".into(), ChallengeProgress::unlocked());

        let merged = ProgressStore::merge_with_catalog(stored, &catalog(&["a", "b"]));

        assert_eq!(merged.len(), 2);
        assert!(!merged.contains_key(&ChallengeId::from("gone")));
        assert_eq!(status(&merged, "b"), ChallengeStatus::Locked);
    }

    #[test]
    fn test_merge_never_locks_first() {
        let mut stored = ProgressMap::new();
        stored.insert("a".into(), ChallengeProgress::locked());

        let merged = ProgressStore::merge_with_catalog(stored, &catalog(&["a", "b"]));
        assert_eq!(status(&merged, "a"), ChallengeStatus::Unlocked);
    }

    #[test]
    fn test_merge_unlocks_successor_of_completed_frontier() {
        let mut stored = ProgressMap::new();
        stored.insert("a".into(), ChallengeProgress::with_status(ChallengeStatus::Completed));

        let merged = ProgressStore::merge_with_catalog(stored, &catalog(&["a", "b", "c"]));
        assert_eq!(status(&merged, "b"), ChallengeStatus::Unlocked);
        assert_eq!(status(&merged, "c"), ChallengeStatus::Locked);
    }

    #[test]
    fn test_merge_keeps_counters() {
        let mut stored = ProgressMap::new();
        stored.insert(
            "a".into(),
            ChallengeProgress {
                status: ChallengeStatus::Unlocked,
                streak: 3,
                previous_similarity_score: 88.0,
            },
        );

        let merged = ProgressStore::merge_with_catalog(stored, &catalog(&["a"]));
        assert_eq!(merged[&ChallengeId::from("a")].streak, 3);
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let store = ProgressStore::new(Arc::new(InMemoryKeyValueStore::new()));
        let catalog = catalog(&["a", "b"]);

        let mut map = ProgressStore::initialize_defaults(&catalog);
        map.insert(
            "a".into(),
            ChallengeProgress {
                status: ChallengeStatus::Completed,
                streak: 2,
                previous_similarity_score: 91.5,
            },
        );
        map.insert("b".into(), ChallengeProgress::unlocked());

        store.save(&map).await.unwrap();
        assert_eq!(store.load(&catalog).await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_load_without_stored_value_uses_defaults() {
        let store = ProgressStore::new(Arc::new(InMemoryKeyValueStore::new()));
        let catalog = catalog(&["a", "b"]);

        assert_eq!(
            store.load(&catalog).await.unwrap(),
            ProgressStore::initialize_defaults(&catalog)
        );
    }

    #[tokio::test]
    async fn test_corrupt_value_self_heals() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        kv.put(PROGRESS_STORAGE_KEY, "{not json").await.unwrap();
        let store = ProgressStore::new(kv);
        let catalog = catalog(&["a", "b"]);

        assert_eq!(
            store.load(&catalog).await.unwrap(),
            ProgressStore::initialize_defaults(&catalog)
        );
    }

    #[tokio::test]
    async fn test_save_rejects_empty_map() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let store = ProgressStore::new(kv.clone());

        let err = store.save(&ProgressMap::new()).await.unwrap_err();
        assert!(matches!(err, ProgressError::EmptyProgressMap));
        assert!(kv.get(PROGRESS_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_overwrites() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let store = ProgressStore::new(kv);
        let catalog = catalog(&["a", "b"]);

        let mut map = ProgressStore::initialize_defaults(&catalog);
        map.insert("b".into(), ChallengeProgress::unlocked());
        store.save(&map).await.unwrap();

        let reset = store.reset(&catalog).await.unwrap();
        assert_eq!(reset, ProgressStore::initialize_defaults(&catalog));
        assert_eq!(store.load(&catalog).await.unwrap(), reset);
    }
}
