//! Challenge catalog model.
//!
//! Challenges are static task definitions loaded once at startup. Catalog
//! order is significant: the first entry starts unlocked, and passing the
//! frontier challenge unlocks the one after it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use super::image::ImageRef;
use crate::domain::error::CatalogError;

/// Stable identifier of a challenge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChallengeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ChallengeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,

    /// Short display name
    pub name: String,

    /// Goal shown to the user and passed to the scoring oracle
    pub description: String,

    /// The image the user is trying to reproduce
    pub target_image: ImageRef,
}

impl Challenge {
    pub fn new(
        id: impl Into<ChallengeId>,
        name: impl Into<String>,
        description: impl Into<String>,
        target_image: ImageRef,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            target_image,
        }
    }
}

/// Ordered, validated set of challenges.
#[derive(Debug, Clone)]
pub struct ChallengeCatalog {
    challenges: Vec<Challenge>,
}

impl ChallengeCatalog {
    /// Build a catalog, rejecting empty catalogs, blank ids and duplicates.
    pub fn new(challenges: Vec<Challenge>) -> Result<Self, CatalogError> {
        if challenges.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(challenges.len());
        for (position, challenge) in challenges.iter().enumerate() {
            if challenge.id.as_str().trim().is_empty() {
                return Err(CatalogError::BlankId(position));
            }
            if !seen.insert(challenge.id.clone()) {
                return Err(CatalogError::DuplicateId(challenge.id.clone()));
            }
        }

        Ok(Self { challenges })
    }

    /// Catalog shipped with the client, used when configuration supplies none.
    pub fn builtin() -> Self {
        Self {
            challenges: builtin_challenges(),
        }
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// First challenge in catalog order. Catalogs are never empty.
    pub fn first(&self) -> &Challenge {
        &self.challenges[0]
    }

    pub fn get(&self, id: &ChallengeId) -> Option<&Challenge> {
        self.challenges.iter().find(|c| &c.id == id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Challenge> {
        self.challenges.get(index)
    }

    pub fn index_of(&self, id: &ChallengeId) -> Option<usize> {
        self.challenges.iter().position(|c| &c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.iter()
    }

    pub fn as_slice(&self) -> &[Challenge] {
        &self.challenges
    }
}

/// Default catalog entries.
pub fn builtin_challenges() -> Vec<Challenge> {
    vec![
        Challenge::new(
            "lighthouse",
            "Lighthouse at Dusk",
            "Recreate a lone lighthouse on a rocky shore under an orange dusk sky.",
            ImageRef::Path(PathBuf::from(".promptcraft/targets/lighthouse.jpg")),
        ),
        Challenge::new(
            "still-life",
            "Fruit Still Life",
            "Recreate a classical still life: a bowl of pears and grapes on a dark wooden table.",
            ImageRef::Path(PathBuf::from(".promptcraft/targets/still-life.jpg")),
        ),
        Challenge::new(
            "neon-alley",
            "Neon Alley",
            "Recreate a rain-soaked city alley lit by pink and cyan neon signs at night.",
            ImageRef::Path(PathBuf::from(".promptcraft/targets/neon-alley.jpg")),
        ),
    ]
}
