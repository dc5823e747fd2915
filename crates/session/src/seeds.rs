//! Episode seed bookkeeping.

use crate::SessionError;

/// Upper bound (exclusive) for a generated seed.
pub const RANDOM_SEED_BOUND: u64 = 10_000_000_000;

/// Ordered, fixed-length list of episode seeds with a forward-only cursor.
///
/// The length of the sequence is the number of episodes the session is
/// graded over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSequence {
    seeds: Vec<u64>,
    episode_index: usize,
}

impl SeedSequence {
    /// # Errors
    ///
    /// Returns [`SessionError::EmptySeedSequence`] for an empty list.
    pub fn new(seeds: Vec<u64>) -> Result<Self, SessionError> {
        if seeds.is_empty() {
            return Err(SessionError::EmptySeedSequence);
        }
        Ok(Self {
            seeds,
            episode_index: 0,
        })
    }

    /// A one-episode sequence with a seed drawn from `[0, RANDOM_SEED_BOUND)`.
    #[must_use]
    pub fn random() -> Self {
        Self {
            seeds: vec![fastrand::u64(..RANDOM_SEED_BOUND)],
            episode_index: 0,
        }
    }

    /// Uses `seeds` when given, otherwise a single random seed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptySeedSequence`] for `Some` empty list.
    pub fn from_option(seeds: Option<Vec<u64>>) -> Result<Self, SessionError> {
        seeds.map_or_else(|| Ok(Self::random()), Self::new)
    }

    /// Seed of the current episode.
    ///
    /// # Panics
    ///
    /// Panics when the sequence is exhausted; check [`has_next`](Self::has_next)
    /// or use [`get`](Self::get).
    #[must_use]
    pub fn current(&self) -> u64 {
        self.seeds[self.episode_index]
    }

    /// Seed of the current episode, or `None` once exhausted.
    #[must_use]
    pub fn get(&self) -> Option<u64> {
        self.seeds.get(self.episode_index).copied()
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.episode_index < self.seeds.len()
    }

    pub fn advance(&mut self) {
        self.episode_index += 1;
    }

    #[must_use]
    pub fn episode_index(&self) -> usize {
        self.episode_index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Always `false`; construction rejects empty lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}
