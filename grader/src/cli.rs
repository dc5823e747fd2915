//! Command-line surface.

use std::time::Duration;

use clap::Parser;
use dispatch::dispatcher::DEFAULT_SERVICE_ID;
use dispatch::DispatcherConfig;
use session::{SeedSequence, SessionError};
use transport::BrokerConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "grader", version, about = "Serve one graded simulation session over a Redis queue")]
pub struct Cli {
    /// Redis port
    #[arg(long)]
    pub port: u16,

    /// Redis host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Redis database index
    #[arg(long, default_value_t = 0)]
    pub db: i64,

    /// Redis password
    #[arg(long)]
    pub password: Option<String>,

    /// Instance identifier, part of the command queue name
    #[arg(long, default_value = DEFAULT_SERVICE_ID)]
    pub service_id: String,

    /// Comma-separated episode seeds; one random seed when omitted
    #[arg(long, value_delimiter = ',')]
    pub seeds: Option<Vec<u64>>,

    /// Wake up from an idle command queue every N seconds
    #[arg(long)]
    pub receive_timeout_secs: Option<u64>,

    /// Log every command, response and the running score
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub fn broker(&self) -> BrokerConfig {
        BrokerConfig {
            host: self.host.clone(),
            port: self.port,
            db: self.db,
            password: self.password.clone(),
        }
    }

    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            service_id: self.service_id.clone(),
            receive_timeout: self.receive_timeout_secs.map(Duration::from_secs),
            ..DispatcherConfig::default()
        }
    }

    /// # Errors
    ///
    /// [`SessionError::EmptySeedSequence`] if `--seeds` was given but empty.
    pub fn seed_sequence(&self) -> Result<SeedSequence, SessionError> {
        SeedSequence::from_option(self.seeds.clone())
    }
}
