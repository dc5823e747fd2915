#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Grading Session
//!
//! Owns the single environment a grading process is allowed to create, the
//! seed sequence that defines its episodes, and the reward accumulated over
//! all of them.
//!
//! The session moves between two states, *uncreated* and *active*. The first
//! [`create`](EnvironmentSession::create) builds the environment and resets
//! it with the first seed; there is no way back and no way to build a second
//! one. Each [`reset_episode`](EnvironmentSession::reset_episode) moves on to
//! the next seed until the sequence runs out. The submitted score is the
//! cumulative reward divided by the *configured* number of episodes, whether
//! or not the client played them all.

use sim::{EnvError, EnvFactory, EnvOptions, Environment, Observation, Transition};
use thiserror::Error;
use tracing::{debug, info};

pub mod seeds;

pub use seeds::SeedSequence;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Attempt to create environment when one already exists.")]
    AlreadyCreated,
    #[error("No environment has been created yet.")]
    NotCreated,
    #[error("seed sequence must contain at least one seed")]
    EmptySeedSequence,
    #[error("seed sequence is exhausted")]
    SeedsExhausted,
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Result of moving to the next episode.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    /// First observation of the new episode.
    Observation(Observation),
    /// Every configured episode has been played.
    Exhausted,
}

pub struct EnvironmentSession<F: EnvFactory> {
    factory: F,
    env: Option<F::Env>,
    seeds: SeedSequence,
    cumulative_reward: f64,
}

impl<F: EnvFactory> EnvironmentSession<F> {
    #[must_use]
    pub fn new(factory: F, seeds: SeedSequence) -> Self {
        Self {
            factory,
            env: None,
            seeds,
            cumulative_reward: 0.0,
        }
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.env.is_some()
    }

    #[must_use]
    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    #[must_use]
    pub fn seeds(&self) -> &SeedSequence {
        &self.seeds
    }

    /// Fails with [`SessionError::AlreadyCreated`] once the environment exists.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_uncreated(&self) -> Result<(), SessionError> {
        if self.is_created() {
            Err(SessionError::AlreadyCreated)
        } else {
            Ok(())
        }
    }

    /// Builds the environment and starts the first episode.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyCreated`] if an environment exists, otherwise
    /// whatever the factory or the first reset reports.
    pub fn create(&mut self, options: &EnvOptions) -> Result<Observation, SessionError> {
        self.ensure_uncreated()?;
        let seed = self.seeds.get().ok_or(SessionError::SeedsExhausted)?;

        info!(visualize = options.visualize, max_obstacles = options.max_obstacles, "creating environment");
        // Stored before the first reset: even a failed reset counts as the
        // one environment this process gets.
        let env = self.env.insert(self.factory.create(options)?);
        let observation = env.reset(seed)?;
        debug!(seed, episode = self.seeds.episode_index(), "episode started");
        Ok(observation)
    }

    /// Advances to the next seed and resets the environment with it.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotCreated`] before [`create`](Self::create); the seed
    /// cursor is left untouched in that case. Environment failures are
    /// passed through.
    pub fn reset_episode(&mut self) -> Result<ResetOutcome, SessionError> {
        let env = self.env.as_mut().ok_or(SessionError::NotCreated)?;
        self.seeds.advance();
        match self.seeds.get() {
            Some(seed) => {
                let observation = env.reset(seed)?;
                debug!(seed, episode = self.seeds.episode_index(), "episode started");
                Ok(ResetOutcome::Observation(observation))
            }
            None => {
                debug!(episodes = self.seeds.len(), "no episodes left");
                Ok(ResetOutcome::Exhausted)
            }
        }
    }

    /// Applies `action` and adds the step reward to the running total.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotCreated`] before [`create`](Self::create), or the
    /// environment's own error.
    pub fn step(&mut self, action: &[f64]) -> Result<Transition, SessionError> {
        let env = self.env.as_mut().ok_or(SessionError::NotCreated)?;
        let transition = env.step(action)?;
        self.cumulative_reward += transition.reward;
        Ok(transition)
    }

    /// Cumulative reward averaged over the configured number of episodes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn submit_mean_reward(&self) -> f64 {
        self.cumulative_reward / self.seeds.len() as f64
    }
}
