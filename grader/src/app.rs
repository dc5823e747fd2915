//! Wiring: broker, session and dispatcher.

use anyhow::{Context, Result};
use dispatch::{CommandDispatcher, Outcome, ResponseKind};
use session::EnvironmentSession;
use sim::ObstacleRunFactory;
use tracing::info;
use transport::RedisQueue;

use crate::cli::Cli;

/// Connects to the broker and serves commands until the session ends.
///
/// # Errors
///
/// Fails if the broker cannot be reached, the seed list is empty, or the
/// broker drops out while the loop is running.
pub fn run(cli: &Cli) -> Result<Outcome> {
    let seeds = cli.seed_sequence()?;
    info!(episodes = seeds.len(), "seed sequence ready");

    let transport = RedisQueue::connect(&cli.broker()).context("failed to reach the queue broker")?;
    let session = EnvironmentSession::new(ObstacleRunFactory::default(), seeds);
    let mut dispatcher = CommandDispatcher::new(transport, session, cli.dispatcher_config());

    dispatcher.run().context("command loop aborted")
}

/// Final report line for a finished run.
#[must_use]
pub fn report(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Finished(response) if response.kind == ResponseKind::EnvSubmitResponse => {
            format!("Cumulative Reward : {}", response.payload)
        }
        Outcome::Finished(response) => match response.payload.as_str() {
            Some(message) => format!("Evaluation Failed : {message}"),
            None => format!("Evaluation Failed : {}", response.payload),
        },
        Outcome::Shutdown => "Stopped before submission".to_string(),
    }
}
