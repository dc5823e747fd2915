#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Command Dispatch
//!
//! The grading server's request loop. Commands arrive as JSON on a single
//! command queue, are applied to the one [`EnvironmentSession`] the process
//! owns, and each gets exactly one JSON reply on the queue it names.
//!
//! ## Protocol
//!
//! | Command      | Effect                         | Reply                                   |
//! |--------------|--------------------------------|-----------------------------------------|
//! | `PING`       | none                           | `PONG`, `{}`                            |
//! | `ENV_CREATE` | build env, first episode       | `ENV_CREATE_RESPONSE`, `{observation}`  |
//! | `ENV_RESET`  | next episode                   | `ENV_RESET_RESPONSE`, `{observation}` or `{observation: false}` |
//! | `ENV_STEP`   | apply `payload.action`         | `ENV_STEP_RESPONSE`, `{observation, reward, done, info}` |
//! | `ENV_SUBMIT` | score the session, stop        | `ENV_SUBMIT_RESPONSE`, mean reward      |
//!
//! ## Termination
//!
//! The loop stops after `ENV_SUBMIT`, and on the first error of any kind:
//! the error is sent as `{"type": "ERROR", "payload": "<message>"}` to the
//! best reply channel known at that point and the run ends. A transport
//! failure that leaves no channel to reply on ends the run with an `Err`.
//!
//! [`EnvironmentSession`]: session::EnvironmentSession

use session::SessionError;
use thiserror::Error;
use transport::TransportError;

pub mod dispatcher;
pub mod protocol;

pub use dispatcher::{CommandDispatcher, DispatcherConfig, Flow, Outcome, ShutdownSignal};
pub use protocol::{Command, RawCommand, Response, ResponseKind, DEFAULT_RESPONSE_CHANNEL};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{0}")]
    Malformed(#[source] serde_json::Error),
    #[error("command has no response_channel")]
    MissingResponseChannel,
    #[error("command has no '{0}' field")]
    MissingField(&'static str),
    #[error("invalid payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("UNKNOWN_REQUEST:{0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Error taxonomy used for logging and for the termination policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The message could not be read far enough to route it.
    ProtocolDecode,
    /// A second `ENV_CREATE`.
    SessionState,
    UnknownCommand,
    /// Anything raised while serving a well-formed command.
    HandlerFault,
    Transport,
}

impl ErrorKind {
    /// Whether an error of this kind ends the session. Currently every kind
    /// does.
    #[must_use]
    pub fn ends_session(self) -> bool {
        match self {
            ErrorKind::ProtocolDecode
            | ErrorKind::SessionState
            | ErrorKind::UnknownCommand
            | ErrorKind::HandlerFault
            | ErrorKind::Transport => true,
        }
    }
}

impl DispatchError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Malformed(_)
            | DispatchError::MissingResponseChannel
            | DispatchError::MissingField(_)
            | DispatchError::Payload(_) => ErrorKind::ProtocolDecode,
            DispatchError::Session(SessionError::AlreadyCreated) => ErrorKind::SessionState,
            DispatchError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            DispatchError::Session(_) | DispatchError::Encode(_) => ErrorKind::HandlerFault,
            DispatchError::Transport(_) => ErrorKind::Transport,
        }
    }
}
