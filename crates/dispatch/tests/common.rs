#![allow(dead_code)]

use dispatch::{CommandDispatcher, DispatcherConfig, Response};
use serde_json::{json, Value};
use session::{EnvironmentSession, SeedSequence};
use sim::{EnvError, EnvOptions, Environment, Observation, Transition};
use transport::MemoryQueue;

pub const REPLY: &str = "client::replies";

/// Observation is `[seed, steps]`, each step pays 1.0. An action whose first
/// component is negative makes the environment fail.
pub struct CountingEnv {
    seed: u64,
    steps: u32,
    pub visualize: bool,
}

impl Environment for CountingEnv {
    #[allow(clippy::cast_precision_loss)]
    fn reset(&mut self, seed: u64) -> Result<Observation, EnvError> {
        self.seed = seed;
        self.steps = 0;
        Ok(vec![seed as f64, 0.0])
    }

    #[allow(clippy::cast_precision_loss)]
    fn step(&mut self, action: &[f64]) -> Result<Transition, EnvError> {
        if action.first().is_some_and(|a| *a < 0.0) {
            return Err(EnvError::NonFiniteAction { index: 0 });
        }
        self.steps += 1;
        Ok(Transition {
            observation: vec![self.seed as f64, f64::from(self.steps)],
            reward: 1.0,
            done: self.steps % 3 == 0,
            info: json!({ "visualize": self.visualize, "steps": self.steps }),
        })
    }
}

pub type Factory = fn(&EnvOptions) -> Result<CountingEnv, EnvError>;

fn counting(options: &EnvOptions) -> Result<CountingEnv, EnvError> {
    Ok(CountingEnv {
        seed: 0,
        steps: 0,
        visualize: options.visualize,
    })
}

pub fn dispatcher(queue: &MemoryQueue, seeds: Vec<u64>) -> CommandDispatcher<MemoryQueue, Factory> {
    let session = EnvironmentSession::new(counting as Factory, SeedSequence::new(seeds).unwrap());
    CommandDispatcher::new(queue.clone(), session, DispatcherConfig::default())
}

pub fn command_queue() -> String {
    DispatcherConfig::default().command_queue()
}

pub fn send(queue: &MemoryQueue, kind: &str, payload: Value) {
    let message = json!({ "type": kind, "payload": payload, "response_channel": REPLY });
    queue.push(&command_queue(), message.to_string());
}

pub fn replies(queue: &MemoryQueue, channel: &str) -> Vec<Response> {
    queue
        .drain(channel)
        .iter()
        .map(|raw| serde_json::from_slice(raw).unwrap())
        .collect()
}
