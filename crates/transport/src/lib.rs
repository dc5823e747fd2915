#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Queue Transport
//!
//! A thin abstraction over the two broker primitives the grading server
//! needs: a blocking pop from a named FIFO queue and a non-blocking push onto
//! one. The crate knows nothing about the messages it carries; framing and
//! protocol live in the `dispatch` crate.
//!
//! Two backends are provided:
//!
//! -   [`RedisQueue`] (feature `redis`, enabled by default) talks to a Redis
//!     server. Commands are popped with `BRPOP` and responses are pushed with
//!     `RPUSH`, which keeps both directions FIFO for clients that `LPUSH`
//!     their commands and `BLPOP` their replies.
//! -   [`MemoryQueue`] (feature `mock`) keeps queues in process memory and is
//!     used by the test suites in place of a live broker.

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "mock")]
mod memory;
#[cfg(feature = "redis")]
mod redis_queue;

#[cfg(feature = "mock")]
pub use memory::MemoryQueue;
#[cfg(feature = "redis")]
pub use redis_queue::{BrokerConfig, RedisQueue};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("broker i/o failure on queue '{queue}': {reason}")]
    Io { queue: String, reason: String },
}

/// How long [`QueueTransport::receive`] may block before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wait {
    /// Block until a message arrives.
    #[default]
    Forever,
    /// Block for at most the given duration.
    Timeout(Duration),
}

pub trait QueueTransport {
    /// Pops the oldest message from `queue`, blocking according to `wait`.
    ///
    /// Returns `Ok(None)` only when a [`Wait::Timeout`] elapsed with the queue
    /// still empty. With [`Wait::Forever`] the call returns a message or an
    /// error.
    ///
    /// Messages come back as the raw bytes stored on the broker; nothing
    /// here checks that they are text.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the broker cannot be reached or the
    /// pop fails. Failures are never retried here.
    fn receive(&mut self, queue: &str, wait: Wait) -> Result<Option<Vec<u8>>, TransportError>;

    /// Appends `message` as the newest element of `queue`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the broker cannot be reached or the
    /// push fails.
    fn send(&mut self, queue: &str, message: &str) -> Result<(), TransportError>;
}
