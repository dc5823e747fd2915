//! The receive → handle → reply loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use session::EnvironmentSession;
use sim::EnvFactory;
use tracing::{debug, error, info};
use transport::{QueueTransport, Wait};

use crate::protocol::{create_options, Command, RawCommand, Response, DEFAULT_RESPONSE_CHANNEL};
use crate::{DispatchError, ErrorKind};

/// Queue namespace shared by every grading service.
pub const NAMESPACE: &str = "osim-rl";
pub const DEFAULT_SERVICE_ID: &str = "osim_rl_redis_service_id";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub namespace: String,
    /// Distinguishes grading services sharing one broker.
    pub service_id: String,
    /// Reply channel for commands too broken to name their own.
    pub default_response_channel: String,
    /// `None` blocks on the command queue indefinitely. With a timeout the
    /// loop wakes up periodically to check its [`ShutdownSignal`].
    pub receive_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            service_id: DEFAULT_SERVICE_ID.to_string(),
            default_response_channel: DEFAULT_RESPONSE_CHANNEL.to_string(),
            receive_timeout: None,
        }
    }
}

impl DispatcherConfig {
    /// `<namespace>::<service_id>::commands`
    #[must_use]
    pub fn command_queue(&self) -> String {
        format!("{}::{}::commands", self.namespace, self.service_id)
    }

    fn wait(&self) -> Wait {
        self.receive_timeout.map_or(Wait::Forever, Wait::Timeout)
    }
}

/// External request to stop the loop.
///
/// Checked before every receive and whenever a timed receive comes back
/// empty; it cannot interrupt a receive that blocks forever.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the loop does after replying.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Reply and wait for the next command.
    Continue(Response),
    /// Reply and stop.
    Finish(Response),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The last reply sent: the submitted score, or the error that ended the
    /// session.
    Finished(Response),
    /// The [`ShutdownSignal`] fired between commands.
    Shutdown,
}

impl Outcome {
    #[must_use]
    pub fn mean_reward(&self) -> Option<f64> {
        match self {
            Outcome::Finished(response) => response.mean_reward(),
            Outcome::Shutdown => None,
        }
    }
}

pub struct CommandDispatcher<T: QueueTransport, F: EnvFactory> {
    transport: T,
    session: EnvironmentSession<F>,
    config: DispatcherConfig,
    command_queue: String,
    shutdown: ShutdownSignal,
}

impl<T: QueueTransport, F: EnvFactory> CommandDispatcher<T, F> {
    #[must_use]
    pub fn new(transport: T, session: EnvironmentSession<F>, config: DispatcherConfig) -> Self {
        let command_queue = config.command_queue();
        Self {
            transport,
            session,
            config,
            command_queue,
            shutdown: ShutdownSignal::new(),
        }
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    #[must_use]
    pub fn command_queue(&self) -> &str {
        &self.command_queue
    }

    #[must_use]
    pub fn session(&self) -> &EnvironmentSession<F> {
        &self.session
    }

    /// Serves commands until the session ends.
    ///
    /// # Errors
    ///
    /// Only transport failures are returned: a receive that fails, or a reply
    /// that cannot be pushed. Every other failure is reported to the client
    /// and comes back as [`Outcome::Finished`] with an error response.
    pub fn run(&mut self) -> Result<Outcome, DispatchError> {
        info!("Listening for commands at : {}", self.command_queue);
        loop {
            let Some(raw) = self.next_message()? else {
                info!("shutdown requested, leaving command loop");
                return Ok(Outcome::Shutdown);
            };
            self.log_progress();

            let mut channel = self.config.default_response_channel.clone();
            match self.process(&raw, &mut channel) {
                Ok(Flow::Continue(response)) => self.reply(&channel, &response)?,
                Ok(Flow::Finish(response)) => {
                    self.reply(&channel, &response)?;
                    return Ok(Outcome::Finished(response));
                }
                Err(err) => {
                    let kind = err.kind();
                    error!(?kind, channel = %channel, "Error : {err}");
                    let response = Response::error(err.to_string());
                    self.reply(&channel, &response)?;
                    if kind.ends_session() {
                        return Ok(Outcome::Finished(response));
                    }
                }
            }
        }
    }

    /// Blocks for the next command; `None` once shutdown has been requested.
    fn next_message(&mut self) -> Result<Option<Vec<u8>>, DispatchError> {
        let wait = self.config.wait();
        loop {
            if self.shutdown.is_triggered() {
                return Ok(None);
            }
            if let Some(raw) = self.transport.receive(&self.command_queue, wait)? {
                return Ok(Some(raw));
            }
        }
    }

    fn log_progress(&self) {
        let seeds = self.session.seeds();
        debug!(
            reward = self.session.cumulative_reward(),
            simulation = seeds.episode_index(),
            seed = seeds.get(),
            "command received"
        );
    }

    /// Decodes and handles one message. `channel` is updated as soon as the
    /// command's own reply channel is known.
    fn process(&mut self, raw: &[u8], channel: &mut String) -> Result<Flow, DispatchError> {
        let raw = RawCommand::parse(raw)?;
        channel.clear();
        channel.push_str(raw.response_channel());
        let command = raw.into_command()?;
        debug!(command = command.name(), "Received Request : {command:?}");
        self.handle(command)
    }

    /// Applies a decoded command to the session.
    ///
    /// # Errors
    ///
    /// Whatever the session reports, and [`DispatchError::UnknownCommand`]
    /// for [`Command::Unknown`].
    pub fn handle(&mut self, command: Command) -> Result<Flow, DispatchError> {
        match command {
            Command::Ping => Ok(Flow::Continue(Response::pong())),
            Command::EnvCreate { payload } => {
                self.session.ensure_uncreated()?;
                let options = create_options(payload)?;
                let observation = self.session.create(&options)?;
                Ok(Flow::Continue(Response::created(observation)))
            }
            Command::EnvReset => {
                let outcome = self.session.reset_episode()?;
                Ok(Flow::Continue(Response::reset(outcome)))
            }
            Command::EnvStep { action } => {
                let transition = self.session.step(&action)?;
                Ok(Flow::Continue(Response::step(&transition)?))
            }
            Command::EnvSubmit => {
                let mean = self.session.submit_mean_reward();
                info!(mean_reward = mean, episodes = self.session.seeds().len(), "session submitted");
                Ok(Flow::Finish(Response::submitted(mean)))
            }
            Command::Unknown { raw } => Err(DispatchError::UnknownCommand(raw.to_string())),
        }
    }

    fn reply(&mut self, channel: &str, response: &Response) -> Result<(), DispatchError> {
        let encoded = match response.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(kind = ?ErrorKind::HandlerFault, "Error : {err}");
                Response::error(err.to_string()).encode()?
            }
        };
        debug!(channel, "Responding with : {encoded}");
        self.transport.send(channel, &encoded)?;
        Ok(())
    }
}
