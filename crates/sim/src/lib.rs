#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Simulation Environments
//!
//! The capability contract the grading session drives, plus the environment
//! the grader ships with.
//!
//! An environment is an opaque stateful object. It is built once from
//! [`EnvOptions`] by an [`EnvFactory`], reset with an episode seed, and then
//! stepped with flat numeric action vectors. Every step yields a
//! [`Transition`]: the next observation, a scalar reward, a termination flag
//! and free-form diagnostic info that is forwarded to the client verbatim.
//!
//! [`ObstacleRun`] is the concrete environment: a seeded runner course
//! scattered with a fixed number of obstacles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod obstacle_run;

pub use obstacle_run::{ObstacleRun, ObstacleRunConfig, ObstacleRunFactory};

/// Flat, ordered observation vector.
pub type Observation = Vec<f64>;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("action has {got} components, expected {expected}")]
    ActionShape { expected: usize, got: usize },
    #[error("action component {index} is not finite")]
    NonFiniteAction { index: usize },
    #[error("environment stepped before its first reset")]
    NotReset,
    #[error("environment construction failed: {0}")]
    Construction(String),
}

/// Construction options.
///
/// Only `visualize` is chosen by the client; everything else is fixed by
/// the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvOptions {
    pub visualize: bool,
    /// Number of obstacles placed on the course each episode.
    pub max_obstacles: usize,
}

/// Obstacle count every grading session runs with.
pub const DEFAULT_MAX_OBSTACLES: usize = 10;

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            visualize: false,
            max_obstacles: DEFAULT_MAX_OBSTACLES,
        }
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: serde_json::Value,
}

/// Environment capability contract.
///
/// Inspired by Gym: `reset` starts an episode from a seed and returns the
/// first observation, `step` applies one action.
pub trait Environment {
    /// Starts a new episode deterministically derived from `seed`.
    ///
    /// # Errors
    ///
    /// Implementation specific; returned errors end the grading session.
    fn reset(&mut self, seed: u64) -> Result<Observation, EnvError>;

    /// Applies `action` and advances the simulation by one step.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] for malformed actions or when called before the
    /// first reset.
    fn step(&mut self, action: &[f64]) -> Result<Transition, EnvError>;
}

/// Builds environments on demand.
pub trait EnvFactory {
    type Env: Environment;

    /// # Errors
    ///
    /// Returns [`EnvError::Construction`] if the environment cannot be built.
    fn create(&self, options: &EnvOptions) -> Result<Self::Env, EnvError>;
}

impl<F, E> EnvFactory for F
where
    F: Fn(&EnvOptions) -> Result<E, EnvError>,
    E: Environment,
{
    type Env = E;

    fn create(&self, options: &EnvOptions) -> Result<E, EnvError> {
        self(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_headless_with_fixed_obstacles() {
        let opts = EnvOptions::default();
        assert!(!opts.visualize);
        assert_eq!(opts.max_obstacles, 10);
    }

    #[test]
    fn closures_are_factories() {
        let factory = |opts: &EnvOptions| -> Result<ObstacleRun, EnvError> {
            Ok(ObstacleRun::new(ObstacleRunConfig::default(), opts.visualize))
        };
        let mut env = factory.create(&EnvOptions::default()).unwrap();
        assert_eq!(env.reset(1).unwrap().len(), env.obs_size());
    }

    #[test]
    fn transition_serializes_as_step_payload() {
        let t = Transition {
            observation: vec![1.0, 2.0],
            reward: 0.5,
            done: true,
            info: serde_json::json!({"k": 1}),
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"observation": [1.0, 2.0], "reward": 0.5, "done": true, "info": {"k": 1}})
        );
    }
}
